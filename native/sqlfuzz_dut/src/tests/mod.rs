//! Unit and integration tests for sqlfuzz_dut
//!
//! Submodules follow the library modules. SQLite tests run against real
//! temporary database files; ClickHouse tests cover everything that does
//! not need a server.

mod clickhouse_tests;
mod conninfo_tests;
mod test_utils;
