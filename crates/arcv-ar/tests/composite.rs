use arcv_3d::ErrorKind;
use arcv_ar::{
    CompositeError, CompositorConfig, MarkerAnchor, MarkerCorner, MarkerObservation,
    PlanarCompositor, SourceSequence,
};
use arcv_image::Image;
use arcv_imgproc::interpolation::InterpolationMode;

fn square(id: u32, x: f64, y: f64) -> MarkerObservation {
    MarkerObservation {
        id,
        corners: [[x, y], [x + 10.0, y], [x + 10.0, y + 10.0], [x, y + 10.0]],
    }
}

fn markers() -> Vec<MarkerObservation> {
    vec![
        square(42, 20.0, 120.0),
        square(22, 170.0, 20.0),
        square(7, 90.0, 70.0),
        square(12, 20.0, 20.0),
        square(32, 170.0, 120.0),
    ]
}

fn frame() -> Result<Image<u8, 3>, arcv_image::ImageError> {
    // a horizontal ramp so that any stray write is visible
    let data = (0..150 * 200)
        .flat_map(|i| {
            let v = (i % 200) as u8;
            [v, v / 2, 10]
        })
        .collect();
    Image::new([200, 150].into(), data)
}

#[test]
fn composite_synthetic_frame() -> Result<(), Box<dyn std::error::Error>> {
    let frame = frame()?;
    let source = Image::<u8, 3>::from_size_val([40, 30].into(), 200)?;
    let compositor = PlanarCompositor::default();

    let out = compositor.composite(&frame, &source, &markers())?;
    assert_eq!(out.size(), frame.size());

    // quad spans 17..=183 x 17..=133, the 5x5 erosion trims two pixels
    for (x, y) in [(100, 75), (19, 75), (181, 75), (100, 19), (100, 131)] {
        assert_eq!(out.pixel(x, y), Some(&[200u8, 200, 200][..]), "({x}, {y})");
    }
    for (x, y) in [(18, 75), (182, 75), (100, 18), (100, 132), (5, 5), (195, 145)] {
        assert_eq!(out.pixel(x, y), frame.pixel(x, y), "({x}, {y})");
    }
    Ok(())
}

#[test]
fn missing_marker_passes_frame_through() -> Result<(), Box<dyn std::error::Error>> {
    let frame = frame()?;
    let source = Image::<u8, 3>::from_size_val([40, 30].into(), 200)?;
    let compositor = PlanarCompositor::default();

    let three: Vec<_> = markers().into_iter().filter(|m| m.id != 22).collect();

    let err = compositor
        .composite(&frame, &source, &three)
        .err()
        .ok_or("compositing should fail")?;
    assert_eq!(err, CompositeError::MissingMarker { id: 22 });
    assert_eq!(err.kind(), ErrorKind::InsufficientData);

    let out = compositor.apply(&frame, &source, &three);
    assert_eq!(out.as_slice(), frame.as_slice());
    Ok(())
}

#[test]
fn compositor_config_serde_round_trip() -> Result<(), serde_json::Error> {
    let config = CompositorConfig {
        border_scale: 0.05,
        distance_anchors: (MarkerCorner::TopLeft, MarkerCorner::BottomLeft),
        interpolation: InterpolationMode::Bilinear,
        ..Default::default()
    };
    let json = serde_json::to_string(&config)?;
    let back: CompositorConfig = serde_json::from_str(&json)?;
    assert_eq!(back, config);

    let partial: CompositorConfig = serde_json::from_str(
        r#"{"anchors": {
            "top_left": {"id": 1, "corner": "BottomRight"},
            "top_right": {"id": 2, "corner": "BottomLeft"},
            "bottom_right": {"id": 3, "corner": "TopLeft"},
            "bottom_left": {"id": 4, "corner": "TopRight"}
        }}"#,
    )?;
    assert_eq!(
        partial.anchors.top_left,
        MarkerAnchor::new(1, MarkerCorner::BottomRight)
    );
    assert_eq!(partial.border_scale, 0.02);
    assert_eq!(partial.erode_kernel_size, 5);
    assert_eq!(partial.interpolation, InterpolationMode::Bicubic);
    Ok(())
}

#[test]
fn sequence_drives_compositor() -> Result<(), Box<dyn std::error::Error>> {
    let frame = frame()?;
    let sources = [50u8, 150]
        .into_iter()
        .map(|v| Image::<u8, 3>::from_size_val([40, 30].into(), v))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sequence = SourceSequence::new(sources)?;
    let compositor = PlanarCompositor::default();

    let played: Vec<u8> = (0..3)
        .map(|_| {
            let out = compositor.apply(&frame, sequence.next_frame(), &markers());
            out.as_slice()[(75 * 200 + 100) * 3]
        })
        .collect();
    assert_eq!(played, vec![50, 150, 50]);
    Ok(())
}
