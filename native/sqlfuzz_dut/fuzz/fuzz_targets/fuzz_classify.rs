#![no_main]
//! Error classification fuzzing
//!
//! Structured engine errors drive both engines' rules through the test
//! executor's verdict mapping. Classification must never panic and a
//! syntax message must never be reported as anything else.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sqlfuzz_dut::{DutError, EngineError, CLICKHOUSE_RULES, SQLITE_RULES};

#[derive(Debug, Arbitrary)]
enum Message<'a> {
    SqliteSyntax(&'a str),
    ClickHouseSyntax(&'a str),
    Raw(&'a str),
}

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    code: Option<i32>,
    message: Message<'a>,
}

fuzz_target!(|input: Input| {
    let (message, sqlite_syntax, ch_syntax) = match input.message {
        Message::SqliteSyntax(tok) if !tok.contains('\n') => {
            (format!("near \"{tok}\": syntax error"), true, false)
        }
        Message::ClickHouseSyntax(rest) => {
            (format!("Code: 62. DB::Exception: Syntax error: {rest}"), false, true)
        }
        Message::SqliteSyntax(raw) | Message::Raw(raw) => (raw.to_string(), false, false),
    };

    let busy = input.code.is_some_and(|c| matches!(c & 0xff, 5 | 6));
    let verdict = SQLITE_RULES.verdict(EngineError::new(input.code, message.clone()));
    if sqlite_syntax && !busy {
        assert!(matches!(verdict, Err(DutError::Syntax(_))));
    }

    let verdict = CLICKHOUSE_RULES.verdict(EngineError::new(None, message));
    if ch_syntax {
        assert!(matches!(verdict, Err(DutError::Syntax(_))));
    }
});
