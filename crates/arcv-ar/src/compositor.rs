//! Warping a source image onto the quadrilateral spanned by four markers.
//!
//! Each of the four expected markers contributes one designated corner. The
//! four corners, pushed outward by a border proportional to the distance
//! between two of them, form the destination quadrilateral. The source image
//! is warped onto it by the homography of its own corners and copied into the
//! frame through an eroded mask of the quadrilateral.

use arcv_3d::find_homography;
use arcv_image::{Image, ImageDtype};
use arcv_imgproc::draw::fill_convex_poly;
use arcv_imgproc::interpolation::InterpolationMode;
use arcv_imgproc::morphology::{erode, Kernel};
use arcv_imgproc::warp::warp_perspective;
use arcv_imgproc::copy_with_mask;
use serde::{Deserialize, Serialize};

use crate::error::CompositeError;
use crate::marker::MarkerObservation;

/// A corner of a marker or of the destination quadrilateral, in winding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerCorner {
    /// Top-left corner.
    TopLeft = 0,
    /// Top-right corner.
    TopRight = 1,
    /// Bottom-right corner.
    BottomRight = 2,
    /// Bottom-left corner.
    BottomLeft = 3,
}

impl MarkerCorner {
    /// All corners in winding order.
    pub const ALL: [MarkerCorner; 4] = [
        MarkerCorner::TopLeft,
        MarkerCorner::TopRight,
        MarkerCorner::BottomRight,
        MarkerCorner::BottomLeft,
    ];

    /// Index of the corner in a marker's corner array.
    pub fn index(self) -> usize {
        self as usize
    }

    // direction pointing away from the quadrilateral
    fn outward(self) -> (f64, f64) {
        match self {
            MarkerCorner::TopLeft => (-1.0, -1.0),
            MarkerCorner::TopRight => (1.0, -1.0),
            MarkerCorner::BottomRight => (1.0, 1.0),
            MarkerCorner::BottomLeft => (-1.0, 1.0),
        }
    }
}

/// One marker corner designated as a quadrilateral corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerAnchor {
    /// Identity of the marker.
    pub id: u32,
    /// Which of its corners is used.
    pub corner: MarkerCorner,
}

impl MarkerAnchor {
    /// Designate `corner` of marker `id`.
    pub fn new(id: u32, corner: MarkerCorner) -> Self {
        Self { id, corner }
    }
}

/// Which marker corner lands on each corner of the destination quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTable {
    /// Anchor of the top-left corner.
    pub top_left: MarkerAnchor,
    /// Anchor of the top-right corner.
    pub top_right: MarkerAnchor,
    /// Anchor of the bottom-right corner.
    pub bottom_right: MarkerAnchor,
    /// Anchor of the bottom-left corner.
    pub bottom_left: MarkerAnchor,
}

impl Default for AnchorTable {
    fn default() -> Self {
        Self {
            top_left: MarkerAnchor::new(12, MarkerCorner::TopLeft),
            top_right: MarkerAnchor::new(22, MarkerCorner::TopRight),
            bottom_right: MarkerAnchor::new(32, MarkerCorner::BottomRight),
            bottom_left: MarkerAnchor::new(42, MarkerCorner::BottomLeft),
        }
    }
}

impl AnchorTable {
    /// The anchor of a quadrilateral corner.
    pub fn get(&self, slot: MarkerCorner) -> MarkerAnchor {
        match slot {
            MarkerCorner::TopLeft => self.top_left,
            MarkerCorner::TopRight => self.top_right,
            MarkerCorner::BottomRight => self.bottom_right,
            MarkerCorner::BottomLeft => self.bottom_left,
        }
    }

    /// Identities of the four expected markers, in winding order.
    pub fn ids(&self) -> [u32; 4] {
        MarkerCorner::ALL.map(|slot| self.get(slot).id)
    }
}

/// Settings of the [`PlanarCompositor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Marker corner used for each quadrilateral corner.
    pub anchors: AnchorTable,
    /// Border added around the quadrilateral, as a fraction of the anchor distance.
    pub border_scale: f64,
    /// The two quadrilateral corners whose distance scales the border.
    pub distance_anchors: (MarkerCorner, MarkerCorner),
    /// Side of the square erosion applied to the mask.
    pub erode_kernel_size: usize,
    /// Interpolation of the warped source.
    pub interpolation: InterpolationMode,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            anchors: AnchorTable::default(),
            border_scale: 0.02,
            distance_anchors: (MarkerCorner::TopLeft, MarkerCorner::TopRight),
            erode_kernel_size: 5,
            interpolation: InterpolationMode::Bicubic,
        }
    }
}

/// Composites a source image onto the area framed by four markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanarCompositor {
    config: CompositorConfig,
}

impl PlanarCompositor {
    /// Create a compositor.
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    /// The compositor settings.
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Resolve the destination quadrilateral in winding order.
    ///
    /// Anchor corners are rounded to whole pixels before the border is added.
    /// The first observation of an identity wins, unexpected identities are
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`CompositeError::MissingMarker`] when an expected identity is absent.
    pub fn destination_quad(
        &self,
        observations: &[MarkerObservation],
    ) -> Result<[[f64; 2]; 4], CompositeError> {
        let mut quad = [[0.0; 2]; 4];
        for slot in MarkerCorner::ALL {
            let anchor = self.config.anchors.get(slot);
            let obs = observations
                .iter()
                .find(|o| o.id == anchor.id)
                .ok_or(CompositeError::MissingMarker { id: anchor.id })?;
            let p = obs.corners[anchor.corner.index()];
            if !(p[0].is_finite() && p[1].is_finite()) {
                return Err(CompositeError::InvalidObservation { id: anchor.id });
            }
            quad[slot.index()] = [p[0].round(), p[1].round()];
        }

        let (a, b) = self.config.distance_anchors;
        let (pa, pb) = (quad[a.index()], quad[b.index()]);
        let border = (self.config.border_scale * (pa[0] - pb[0]).hypot(pa[1] - pb[1])).round();

        for slot in MarkerCorner::ALL {
            let (sx, sy) = slot.outward();
            let p = &mut quad[slot.index()];
            p[0] += sx * border;
            p[1] += sy * border;
        }
        Ok(quad)
    }

    /// Composite `source` onto the marker quadrilateral of `frame`.
    ///
    /// # Arguments
    ///
    /// * `frame` - The camera frame.
    /// * `source` - The image to project into the frame.
    /// * `observations` - The markers detected in `frame`.
    ///
    /// # Errors
    ///
    /// * [`CompositeError::MissingMarker`] if an expected marker is absent.
    /// * [`CompositeError::Homography`] if the quadrilateral is degenerate.
    pub fn composite<T, const C: usize>(
        &self,
        frame: &Image<T, C>,
        source: &Image<T, C>,
        observations: &[MarkerObservation],
    ) -> Result<Image<T, C>, CompositeError>
    where
        T: ImageDtype,
    {
        let quad = self.destination_quad(observations)?;

        let (w, h) = (source.cols() as f64, source.rows() as f64);
        let corners = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
        let homography = find_homography(&corners, &quad)?;

        let mut m = [0.0; 9];
        for (i, v) in m.iter_mut().enumerate() {
            *v = homography[(i / 3, i % 3)];
        }

        let mut warped = Image::<T, C>::from_size_val(frame.size(), T::default())?;
        warp_perspective(source, &mut warped, &m, self.config.interpolation)?;

        let mut mask = Image::<u8, 1>::from_size_val(frame.size(), 0)?;
        let polygon = quad.map(|p| (p[0] as i64, p[1] as i64));
        fill_convex_poly(&mut mask, &polygon, [255]);

        let kernel = Kernel::rect(self.config.erode_kernel_size)?;
        let mut eroded = Image::<u8, 1>::from_size_val(frame.size(), 0)?;
        erode(&mask, &mut eroded, &kernel)?;

        let mut out = frame.clone();
        copy_with_mask(&warped, &eroded, &mut out)?;

        log::debug!("Composited {}x{} source onto {quad:?}", source.cols(), source.rows());
        Ok(out)
    }

    /// Composite, or return an unmodified copy of `frame` when compositing is
    /// not possible. The reason is logged at debug level.
    pub fn apply<T, const C: usize>(
        &self,
        frame: &Image<T, C>,
        source: &Image<T, C>,
        observations: &[MarkerObservation],
    ) -> Image<T, C>
    where
        T: ImageDtype,
    {
        match self.composite(frame, source, observations) {
            Ok(out) => out,
            Err(e) => {
                log::debug!("Frame passed through: {e}");
                frame.clone()
            }
        }
    }
}
