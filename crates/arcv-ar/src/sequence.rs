use arcv_image::Image;

use crate::error::ArError;

/// Decoded frames of an animated source, played one per processed frame.
///
/// # Example
///
/// ```
/// use arcv_ar::SourceSequence;
/// use arcv_image::Image;
///
/// let a = Image::<u8, 3>::from_size_val([2, 2].into(), 1)?;
/// let b = Image::<u8, 3>::from_size_val([2, 2].into(), 2)?;
/// let mut seq = SourceSequence::new(vec![a, b])?;
/// assert_eq!(seq.next_frame().as_slice()[0], 1);
/// assert_eq!(seq.next_frame().as_slice()[0], 2);
/// assert_eq!(seq.next_frame().as_slice()[0], 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct SourceSequence<T, const C: usize> {
    frames: Vec<Image<T, C>>,
    next: usize,
}

impl<T, const C: usize> SourceSequence<T, C> {
    /// Create a sequence starting at its first frame.
    ///
    /// # Errors
    ///
    /// [`ArError::EmptySequence`] if `frames` is empty.
    pub fn new(frames: Vec<Image<T, C>>) -> Result<Self, ArError> {
        if frames.is_empty() {
            return Err(ArError::EmptySequence);
        }
        Ok(Self { frames, next: 0 })
    }

    /// The current frame. Advances the sequence, wrapping after the last frame.
    pub fn next_frame(&mut self) -> &Image<T, C> {
        let idx = self.next;
        self.next = (self.next + 1) % self.frames.len();
        &self.frames[idx]
    }

    /// All frames in playback order.
    pub fn frames(&self) -> &[Image<T, C>] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_cycles() -> Result<(), Box<dyn std::error::Error>> {
        let frames = (0..3)
            .map(|v| Image::<u8, 1>::from_size_val([1, 1].into(), v))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seq = SourceSequence::new(frames)?;

        let played: Vec<u8> = (0..7).map(|_| seq.next_frame().as_slice()[0]).collect();
        assert_eq!(played, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(seq.frames().len(), 3);
        Ok(())
    }

    #[test]
    fn test_empty_sequence() {
        let res = SourceSequence::<u8, 3>::new(vec![]);
        assert!(matches!(res, Err(ArError::EmptySequence)));
    }
}
