#![no_main]

use libfuzzer_sys::fuzz_target;
use perf_analyzer::stats::summarize;
use perf_analyzer::table::{extract, MalformedPolicy, RawTable};

fuzz_target!(|data: &[u8]| {
    // First line is the column pattern, the rest a comma-separated table
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, body) = input.split_once('\n').unwrap_or((input, ""));
    let table = RawTable::new(
        body.lines()
            .map(|line| line.split(',').map(String::from).collect())
            .collect(),
    );

    for policy in [MalformedPolicy::CoerceToZero, MalformedPolicy::Fail] {
        if let Ok(values) = extract(&table, pattern, policy) {
            assert_eq!(values.len(), table.data_len());
            let _ = summarize(&values);
        }
    }
});
