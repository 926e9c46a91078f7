use crate::model::{Direction, PlayMode};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Advance { index: usize, link: String },
    Repeat(String),
    SequenceEnded,
    Idle,
}

impl Selection {
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Advance { link, .. } | Self::Repeat(link) => Some(link),
            Self::SequenceEnded | Self::Idle => None,
        }
    }
}

pub fn select(
    queue: &[String],
    current: Option<&str>,
    mode: PlayMode,
    direction: Direction,
    rng: &mut SmallRng,
) -> Selection {
    if queue.is_empty() {
        return Selection::Idle;
    }

    let position = current.and_then(|link| queue.iter().position(|entry| entry == link));
    let len = queue.len();

    let index = match mode {
        PlayMode::Single => {
            return match current {
                Some(link) => Selection::Repeat(link.to_string()),
                None => Selection::Idle,
            };
        }
        PlayMode::Random => random_index(queue, current, rng),
        PlayMode::Sequential => match (position, direction) {
            (Some(pos), Direction::Forward) => {
                let next = pos + 1;
                if next >= len {
                    return Selection::SequenceEnded;
                }
                next
            }
            (Some(pos), Direction::Backward) => pos.checked_sub(1).unwrap_or(len - 1),
            (None, _) => 0,
        },
        PlayMode::Loop => match (position, direction) {
            (Some(pos), Direction::Forward) => (pos + 1) % len,
            (Some(pos), Direction::Backward) => (pos + len - 1) % len,
            (None, _) => 0,
        },
    };

    Selection::Advance {
        index,
        link: queue[index].clone(),
    }
}

// Uniform over everything but `current`; a queue holding only `current`
// falls back to the whole queue.
fn random_index(queue: &[String], current: Option<&str>, rng: &mut SmallRng) -> usize {
    let mut candidates: Vec<usize> = (0..queue.len())
        .filter(|index| Some(queue[*index].as_str()) != current)
        .collect();
    if candidates.is_empty() {
        candidates = (0..queue.len()).collect();
    }
    candidates.shuffle(rng);
    candidates[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;
    use rand::SeedableRng;

    fn queue(links: &[&str]) -> Vec<String> {
        links.iter().map(|link| link.to_string()).collect()
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn sequential_forward_stops_at_the_tail() {
        let q = queue(&["a", "b", "c"]);
        let picked = select(&q, Some("c"), PlayMode::Sequential, Direction::Forward, &mut rng());
        assert_eq!(picked, Selection::SequenceEnded);

        let picked = select(&q, Some("a"), PlayMode::Sequential, Direction::Forward, &mut rng());
        assert_eq!(picked.link(), Some("b"));
    }

    #[test]
    fn sequential_backward_wraps_to_last() {
        let q = queue(&["a", "b", "c"]);
        let picked = select(&q, Some("a"), PlayMode::Sequential, Direction::Backward, &mut rng());
        assert_eq!(
            picked,
            Selection::Advance {
                index: 2,
                link: String::from("c")
            }
        );
    }

    #[test]
    fn loop_wraps_both_ways() {
        let q = queue(&["a", "b", "c"]);
        let forward = select(&q, Some("c"), PlayMode::Loop, Direction::Forward, &mut rng());
        assert_eq!(forward.link(), Some("a"));
        let backward = select(&q, Some("a"), PlayMode::Loop, Direction::Backward, &mut rng());
        assert_eq!(backward.link(), Some("c"));
    }

    #[test]
    fn missing_current_starts_at_head() {
        let q = queue(&["a", "b", "c"]);
        for mode in [PlayMode::Sequential, PlayMode::Loop] {
            for direction in [Direction::Forward, Direction::Backward] {
                let picked = select(&q, Some("zzz"), mode, direction, &mut rng());
                assert_eq!(picked.link(), Some("a"));
                let picked = select(&q, None, mode, direction, &mut rng());
                assert_eq!(picked.link(), Some("a"));
            }
        }
    }

    #[test]
    fn single_repeats_current_or_idles() {
        let q = queue(&["a", "b"]);
        let picked = select(&q, Some("b"), PlayMode::Single, Direction::Forward, &mut rng());
        assert_eq!(picked, Selection::Repeat(String::from("b")));
        let picked = select(&q, None, PlayMode::Single, Direction::Forward, &mut rng());
        assert_eq!(picked, Selection::Idle);
    }

    #[test]
    fn random_avoids_current_when_it_can() {
        let q = queue(&["a", "b"]);
        let mut rng = rng();
        for _ in 0..50 {
            let picked = select(&q, Some("a"), PlayMode::Random, Direction::Forward, &mut rng);
            assert_eq!(picked.link(), Some("b"));
        }
    }

    #[test]
    fn random_falls_back_to_the_whole_queue() {
        let q = queue(&["a"]);
        let picked = select(&q, Some("a"), PlayMode::Random, Direction::Forward, &mut rng());
        assert_eq!(picked.link(), Some("a"));
    }

    #[test]
    fn empty_queue_is_idle() {
        for mode in PlayMode::ALL {
            let picked = select(&[], Some("a"), mode, Direction::Forward, &mut rng());
            assert_eq!(picked, Selection::Idle);
        }
    }

    #[test]
    fn duplicates_resolve_to_first_occurrence() {
        let q = queue(&["a", "b", "a", "c"]);
        let picked = select(&q, Some("a"), PlayMode::Sequential, Direction::Forward, &mut rng());
        assert_eq!(picked.link(), Some("b"));
    }

    proptest::proptest! {
        #[test]
        fn selection_is_always_a_queue_member(
            len in 1usize..30,
            current in 0usize..40,
            seed in proptest::prelude::any::<u64>(),
        ) {
            let q: Vec<String> = (0..len).map(|n| format!("song_{n}")).collect();
            let current = format!("song_{current}");
            let mut rng = SmallRng::seed_from_u64(seed);
            for mode in PlayMode::ALL {
                for direction in [Direction::Forward, Direction::Backward] {
                    let picked = select(&q, Some(&current), mode, direction, &mut rng);
                    match picked {
                        Selection::Advance { index, link } => {
                            prop_assert!(index < q.len());
                            prop_assert!(q[index] == link);
                        }
                        Selection::Repeat(link) => prop_assert!(link == current),
                        Selection::SequenceEnded => {
                            prop_assert!(mode == PlayMode::Sequential);
                            prop_assert!(direction == Direction::Forward);
                            prop_assert!(q.last() == Some(&current));
                        }
                        Selection::Idle => prop_assert!(false, "non-empty queue went idle"),
                    }
                }
            }
        }

        #[test]
        fn loop_never_ends(len in 1usize..30, start in 0usize..30) {
            let q: Vec<String> = (0..len).map(|n| format!("song_{n}")).collect();
            let mut current = q[start.min(len - 1)].clone();
            let mut rng = rng();
            for _ in 0..(len * 2) {
                let picked = select(&q, Some(&current), PlayMode::Loop, Direction::Forward, &mut rng);
                let link = picked.link().map(str::to_string);
                prop_assert!(link.is_some());
                current = link.unwrap_or_default();
            }
        }
    }
}
