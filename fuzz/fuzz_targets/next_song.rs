#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tunequeue::model::{Direction, PlayMode};
use tunequeue::selection::{Selection, select};

fuzz_target!(|data: &[u8]| {
    let Some((&len, steps)) = data.split_first() else {
        return;
    };
    let queue: Vec<String> = (0..len % 24)
        .map(|idx| format!("song_{}", idx % 7))
        .collect();
    let mut rng = SmallRng::seed_from_u64(u64::from(len));
    let mut current: Option<String> = None;
    let mut mode = PlayMode::Sequential;

    for byte in steps {
        match byte % 8 {
            0 => mode = PlayMode::ALL[usize::from(byte / 8) % PlayMode::ALL.len()],
            1 => current = Some(format!("song_{}", byte / 8)),
            2 => current = None,
            _ => {
                let direction = if byte % 2 == 0 {
                    Direction::Forward
                } else {
                    Direction::Backward
                };
                match select(&queue, current.as_deref(), mode, direction, &mut rng) {
                    Selection::Advance { index, link } => {
                        assert_eq!(queue[index], link);
                        current = Some(link);
                    }
                    Selection::Repeat(link) => assert_eq!(current.as_deref(), Some(link.as_str())),
                    Selection::SequenceEnded => {
                        assert_eq!(mode, PlayMode::Sequential);
                        assert_eq!(direction, Direction::Forward);
                    }
                    Selection::Idle => {
                        assert!(queue.is_empty() || (mode == PlayMode::Single && current.is_none()));
                    }
                }
            }
        }
    }
});
