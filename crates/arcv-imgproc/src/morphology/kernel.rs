use super::MorphologyError;

/// Shape of a structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphShape {
    /// Every element is active.
    Rect,
    /// Only the centre row and column are active.
    Cross,
    /// Elements inside the inscribed ellipse are active.
    Ellipse,
}

/// Binary structuring element with its anchor at the centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Kernel {
    /// Create a kernel of the given shape and size.
    ///
    /// # Errors
    ///
    /// [`MorphologyError::EmptyKernel`] when a dimension is zero.
    pub fn new(shape: MorphShape, width: usize, height: usize) -> Result<Self, MorphologyError> {
        if width == 0 || height == 0 {
            return Err(MorphologyError::EmptyKernel(width, height));
        }

        let cy = height / 2;
        let cx = width / 2;

        let mut data = vec![false; width * height];
        for r in 0..height {
            for c in 0..width {
                data[r * width + c] = match shape {
                    MorphShape::Rect => true,
                    MorphShape::Cross => r == cy || c == cx,
                    MorphShape::Ellipse => {
                        let dy = (r as f64 - cy as f64) / (height as f64 / 2.0);
                        let dx = (c as f64 - cx as f64) / (width as f64 / 2.0);
                        dx * dx + dy * dy <= 1.0
                    }
                };
            }
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Square rectangular kernel, e.g. `Kernel::rect(5)` for a 5x5 erosion.
    pub fn rect(size: usize) -> Result<Self, MorphologyError> {
        Self::new(MorphShape::Rect, size, size)
    }

    /// Kernel width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Kernel height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the element at `(x, y)` is active.
    pub fn is_active(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    /// Offsets `(dx, dy)` of the active elements relative to the anchor.
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let (cx, cy) = ((self.width / 2) as isize, (self.height / 2) as isize);
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_active(x, y))
            .map(|(x, y)| (x as isize - cx, y as isize - cy))
            .collect()
    }
}
