#![no_main]
use libfuzzer_sys::fuzz_target;
use wattguard_core::{Command, LineAccumulator};

fuzz_target!(|data: &[u8]| {
    let mut acc = LineAccumulator::new(32);
    // Split the input so partial lines carry across pushes.
    let (a, b) = data.split_at(data.len() / 2);
    for chunk in [a, b] {
        for line in acc.push(chunk) {
            assert!(line.len() <= 32);
            assert!(line.is_ascii());
            if let Ok(cmd) = line.parse::<Command>() {
                assert_eq!(cmd.as_str().parse::<Command>().ok(), Some(cmd));
            }
        }
    }
});
