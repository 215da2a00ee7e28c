use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::QuizError;

/// Build the ordered question list as indices into a collection of `len` entries.
///
/// Without replacement the full index range is shuffled and truncated to
/// `sample_size`; with replacement every draw is independent.
pub fn generate_question_list<R: Rng>(
    rng: &mut R,
    len: usize,
    sample_size: usize,
    with_replacement: bool,
) -> Result<Vec<usize>, QuizError> {
    if with_replacement {
        if len == 0 && sample_size > 0 {
            return Err(QuizError::InsufficientData {
                requested: sample_size,
                available: 0,
            });
        }
        return Ok((0..sample_size).map(|_| rng.gen_range(0..len)).collect());
    }

    if sample_size > len {
        tracing::error!("not enough elements to sample: {} of {}", sample_size, len);
        return Err(QuizError::InsufficientData {
            requested: sample_size,
            available: len,
        });
    }

    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices.truncate(sample_size);
    Ok(indices)
}

/// Ordered question indices and the position currently shown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionList {
    indices: Vec<usize>,
    position: usize,
}

impl QuestionList {
    pub fn new(indices: Vec<usize>) -> Self {
        Self {
            indices,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Vocabulary index of the question at the current position.
    pub fn current(&self) -> Option<usize> {
        self.indices.get(self.position).copied()
    }

    pub fn is_last(&self) -> bool {
        !self.indices.is_empty() && self.position == self.indices.len() - 1
    }

    /// Move to `index`, leaving the position untouched when out of range.
    pub fn jump_to(&mut self, index: isize) -> Result<usize, QuizError> {
        if index < 0 || index as usize >= self.indices.len() {
            return Err(QuizError::IndexOutOfRange {
                index,
                len: self.indices.len(),
            });
        }
        self.position = index as usize;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_without_replacement_unique_and_in_range() {
        let mut rng = rng();
        for len in 0..20 {
            for k in 0..=len {
                let list = generate_question_list(&mut rng, len, k, false).unwrap();
                assert_eq!(list.len(), k);
                let unique: HashSet<_> = list.iter().collect();
                assert_eq!(unique.len(), k);
                assert!(list.iter().all(|&i| i < len));
            }
        }
    }

    #[test]
    fn test_full_sample_is_permutation() {
        let mut rng = rng();
        let mut list = generate_question_list(&mut rng, 10, 10, false).unwrap();
        list.sort();
        assert_eq!(list, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_with_replacement_length_and_range() {
        let mut rng = rng();
        let list = generate_question_list(&mut rng, 3, 50, true).unwrap();
        assert_eq!(list.len(), 50);
        assert!(list.iter().all(|&i| i < 3));
        // 50 draws from 3 values must repeat
        let unique: HashSet<_> = list.iter().collect();
        assert!(unique.len() < list.len());
    }

    #[test]
    fn test_insufficient_data_without_replacement() {
        let mut rng = rng();
        assert_eq!(
            generate_question_list(&mut rng, 2, 5, false),
            Err(QuizError::InsufficientData {
                requested: 5,
                available: 2
            })
        );
    }

    #[test]
    fn test_with_replacement_from_empty_fails() {
        let mut rng = rng();
        assert!(generate_question_list(&mut rng, 0, 1, true).is_err());
        assert_eq!(generate_question_list(&mut rng, 0, 0, true), Ok(vec![]));
    }

    #[test]
    fn test_shuffle_covers_every_position() {
        // each index should land first at least once over many shuffles
        let mut rng = rng();
        let mut firsts = HashSet::new();
        for _ in 0..500 {
            let list = generate_question_list(&mut rng, 4, 4, false).unwrap();
            firsts.insert(list[0]);
        }
        assert_eq!(firsts.len(), 4);
    }

    #[test]
    fn test_jump_out_of_range_is_noop() {
        let mut list = QuestionList::new(vec![4, 2, 0]);
        list.jump_to(1).unwrap();

        assert!(list.jump_to(-1).is_err());
        assert_eq!(list.position(), 1);
        assert_eq!(
            list.jump_to(3),
            Err(QuizError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(list.position(), 1);
        assert_eq!(list.current(), Some(2));
    }

    #[test]
    fn test_sample_is_prefix_of_seeded_shuffle() {
        let list = generate_question_list(&mut rng(), 12, 5, false).unwrap();

        let mut expected: Vec<usize> = (0..12).collect();
        expected.shuffle(&mut rng());
        assert_eq!(list, expected[..5].to_vec());
    }

    #[test]
    fn test_last_position() {
        let mut list = QuestionList::new(vec![1, 0]);
        assert!(!list.is_last());
        list.jump_to(1).unwrap();
        assert!(list.is_last());
        assert!(QuestionList::default().current().is_none());
        assert!(!QuestionList::default().is_last());
    }
}
