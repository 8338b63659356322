//! Contains the Viewport struct, which describes a window onto the
//! complex plane (a centre, two half-widths and a zoom), and the
//! row-major 2-D buffers that an escape-time run reads from and
//! writes into.  Every buffer of one run shares a single `Shape`:
//! rows follow the imaginary axis, columns follow the real axis.
use std::fmt;

use itertools::iproduct;
use num::complex::Complex64;

use crate::errors::{QuantumJuliaError, Result};

/// Height and width of a pixel grid, in that order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows (samples along the imaginary axis).
    pub height: usize,
    /// Number of columns (samples along the real axis).
    pub width: usize,
}

impl Shape {
    /// Rows first, like the buffers themselves.
    pub fn new(height: usize, width: usize) -> Self {
        Shape { height, width }
    }

    /// The total number of points in the grid.
    pub fn len(&self) -> usize {
        self.height * self.width
    }

    /// True when either side is zero.
    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Linear offset of a pixel from the root of a buffer of this shape.
    pub fn offset(&self, pixel: Pixel) -> Option<usize> {
        if pixel.0 >= self.width || pixel.1 >= self.height {
            return None;
        }
        Some(pixel.1 * self.width + pixel.0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Describes the column, row of a point in a grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pixel(pub usize, pub usize);

/// A dense row-major 2-D buffer.  The sample grid, the convergence
/// mask and the divergence grid are all planes of the same shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane<T> {
    shape: Shape,
    data: Vec<T>,
}

/// Complex sample points, one per pixel.
pub type Grid = Plane<Complex64>;

/// `true` while a point has not yet escaped.
pub type ConvergenceMask = Plane<bool>;

/// Iteration index at which each point escaped, or the
/// `max_iterations - 1` sentinel.
pub type DivergenceGrid = Plane<u32>;

impl<T: Clone> Plane<T> {
    /// A plane of the given shape with every entry set to `value`.
    pub fn filled(shape: Shape, value: T) -> Self {
        Plane {
            shape,
            data: vec![value; shape.len()],
        }
    }
}

impl<T> Plane<T> {
    /// Wraps an existing row-major buffer.
    pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(QuantumJuliaError::InvalidGeometry {
                reason: format!(
                    "buffer of {} entries cannot have shape {}",
                    data.len(),
                    shape
                ),
            });
        }
        Ok(Plane { shape, data })
    }

    /// Rows and columns of the plane.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The number of entries, `height * width`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a plane with no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The entry at `pixel`, if it lies inside the plane.
    pub fn get(&self, pixel: Pixel) -> Option<&T> {
        self.shape.offset(pixel).map(|offset| &self.data[offset])
    }

    /// All entries, row-major.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All entries, row-major, for writing.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterates over the rows, top (lowest imaginary part) first.
    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.data.chunks(self.shape.width.max(1))
    }
}

/// A fresh mask with every point still converging.
pub fn build_convergence_mask(shape: Shape) -> ConvergenceMask {
    Plane::filled(shape, true)
}

/// A fresh divergence grid pre-filled with the "never escaped" sentinel,
/// `max_iterations - 1`.
pub fn build_divergence_grid(shape: Shape, max_iterations: u32) -> Result<DivergenceGrid> {
    if max_iterations == 0 {
        return Err(QuantumJuliaError::InvalidParameter {
            reason: "max_iterations must be at least 1".to_string(),
        });
    }
    Ok(Plane::filled(shape, max_iterations - 1))
}

/// `n` evenly spaced samples from `start` to `stop`, both included.
/// The last sample is pinned to `stop` exactly.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / ((n - 1) as f64);
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + (i as f64) * step
                    }
                })
                .collect()
        }
    }
}

/// A window onto the complex plane and the pixel resolution it is
/// sampled at.  The spans covered are `center ± half_width / zoom`
/// horizontally and `center ± half_height / zoom` vertically.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// The point at the middle of the window.
    pub center: Complex64,
    /// Half of the horizontal span at zoom 1.
    pub half_width: f64,
    /// Half of the vertical span at zoom 1.
    pub half_height: f64,
    /// Magnification; larger values shrink both spans.
    pub zoom: f64,
    /// Pixel columns.
    pub width: usize,
    /// Pixel rows.
    pub height: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            center: Complex64::new(0.0, 0.0),
            half_width: 1.5,
            half_height: 1.5,
            zoom: 1.0,
            width: 500,
            height: 500,
        }
    }
}

impl Viewport {
    /// Constructor.  Rejects zero pixel dimensions and non-positive or
    /// non-finite zoom.
    pub fn new(
        center: Complex64,
        half_width: f64,
        half_height: f64,
        zoom: f64,
        width: usize,
        height: usize,
    ) -> Result<Viewport> {
        let viewport = Viewport {
            center,
            half_width,
            half_height,
            zoom,
            width,
            height,
        };
        viewport.validate()?;
        Ok(viewport)
    }

    /// Checks the invariants `new` enforces; fields are public, so a
    /// hand-built viewport is checked again at grid-build time.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(QuantumJuliaError::InvalidGeometry {
                reason: format!(
                    "pixel dimensions must be positive, got {}x{}",
                    self.width, self.height
                ),
            });
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(QuantumJuliaError::InvalidGeometry {
                reason: format!("zoom must be positive and finite, got {}", self.zoom),
            });
        }
        Ok(())
    }

    /// Shape of the grids sampled from this window.
    pub fn shape(&self) -> Shape {
        Shape::new(self.height, self.width)
    }

    /// The lower-left and upper-right corners of the window.
    pub fn bounds(&self) -> (Complex64, Complex64) {
        let dx = self.half_width / self.zoom;
        let dy = self.half_height / self.zoom;
        (
            Complex64::new(self.center.re - dx, self.center.im - dy),
            Complex64::new(self.center.re + dx, self.center.im + dy),
        )
    }

    fn axes(&self) -> (Vec<f64>, Vec<f64>) {
        let (leftlower, rightupper) = self.bounds();
        (
            linspace(leftlower.re, rightupper.re, self.width),
            linspace(leftlower.im, rightupper.im, self.height),
        )
    }

    /// Samples the window.  The point at row `r`, column `c` is
    /// `x[c] + i*y[r]`.
    pub fn build_grid(&self) -> Result<Grid> {
        self.validate()?;
        let (xs, ys) = self.axes();
        let points: Vec<Complex64> = iproduct!(ys.iter(), xs.iter())
            .map(|(&im, &re)| Complex64::new(re, im))
            .collect();
        Plane::from_vec(self.shape(), points)
    }

    /// The grid sample at a given pixel.
    pub fn pixel_to_point(&self, pixel: Pixel) -> Option<Complex64> {
        if self.shape().offset(pixel).is_none() {
            return None;
        }
        let (xs, ys) = self.axes();
        Some(Complex64::new(xs[pixel.0], ys[pixel.1]))
    }

    /// Given a complex number, find the pixel whose sample lies closest
    /// to it, or `None` when the point is outside the window or not
    /// finite.
    pub fn nearest_pixel(&self, point: Complex64) -> Option<Pixel> {
        if !point.re.is_finite() || !point.im.is_finite() {
            return None;
        }
        let (leftlower, rightupper) = self.bounds();
        if point.re < leftlower.re
            || point.re > rightupper.re
            || point.im < leftlower.im
            || point.im > rightupper.im
        {
            return None;
        }
        let nearest = |value: f64, low: f64, high: f64, n: usize| -> usize {
            if n < 2 || high == low {
                return 0;
            }
            let scaled = (value - low) / (high - low) * ((n - 1) as f64);
            (scaled.round() as usize).min(n - 1)
        };
        Some(Pixel(
            nearest(point.re, leftlower.re, rightupper.re, self.width),
            nearest(point.im, leftlower.im, rightupper.im, self.height),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < EPS
    }

    #[test]
    fn viewport_fails_on_zero_pixels() {
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.5, 1.5, 1.0, 0, 10);
        assert!(vp.is_err());
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.5, 1.5, 1.0, 10, 0);
        assert!(vp.is_err());
    }

    #[test]
    fn viewport_fails_on_bad_zoom() {
        for zoom in &[0.0, -1.0, std::f64::NAN, std::f64::INFINITY] {
            let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.5, 1.5, *zoom, 10, 10);
            assert!(vp.is_err(), "zoom {} accepted", zoom);
        }
    }

    #[test]
    fn hand_built_viewport_is_checked_at_build_time() {
        let vp = Viewport {
            width: 0,
            ..Viewport::default()
        };
        match vp.build_grid() {
            Err(QuantumJuliaError::InvalidGeometry { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn corners_match_the_window_at_zoom_one() {
        let vp = Viewport::new(Complex64::new(0.25, -0.5), 1.5, 1.0, 1.0, 7, 5).unwrap();
        let grid = vp.build_grid().unwrap();
        assert_eq!(grid.shape(), Shape::new(5, 7));
        assert!(close(*grid.get(Pixel(0, 0)).unwrap(), Complex64::new(-1.25, -1.5)));
        assert!(close(*grid.get(Pixel(6, 0)).unwrap(), Complex64::new(1.75, -1.5)));
        assert!(close(*grid.get(Pixel(0, 4)).unwrap(), Complex64::new(-1.25, 0.5)));
        assert!(close(*grid.get(Pixel(6, 4)).unwrap(), Complex64::new(1.75, 0.5)));
    }

    #[test]
    fn zoom_shrinks_the_window() {
        let vp = Viewport::new(Complex64::new(1.0, 1.0), 2.0, 2.0, 4.0, 3, 3).unwrap();
        let (leftlower, rightupper) = vp.bounds();
        assert!(close(leftlower, Complex64::new(0.5, 0.5)));
        assert!(close(rightupper, Complex64::new(1.5, 1.5)));
        let grid = vp.build_grid().unwrap();
        assert!(close(*grid.get(Pixel(1, 1)).unwrap(), Complex64::new(1.0, 1.0)));
    }

    #[test]
    fn rows_follow_the_imaginary_axis() {
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.0, 1.0, 1.0, 3, 2).unwrap();
        let grid = vp.build_grid().unwrap();
        let rows: Vec<&[Complex64]> = grid.rows().collect();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), 3);
            assert!(row.iter().all(|z| z.im == row[0].im));
        }
        assert!(rows[0][0].im < rows[1][0].im);
        assert!(rows[0][0].re < rows[0][2].re);
    }

    #[test]
    fn single_pixel_grid_samples_the_lower_left_corner() {
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.0, 1.0, 1.0, 1, 1).unwrap();
        let grid = vp.build_grid().unwrap();
        assert_eq!(grid.as_slice(), &[Complex64::new(-1.0, -1.0)]);
    }

    #[test]
    fn linspace_pins_both_ends() {
        let xs = linspace(-1.5, 1.5, 10);
        assert_eq!(xs.len(), 10);
        assert_eq!(xs[0], -1.5);
        assert_eq!(xs[9], 1.5);
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn fresh_buffers_carry_their_initial_values() {
        let shape = Shape::new(3, 4);
        let mask = build_convergence_mask(shape);
        assert!(mask.as_slice().iter().all(|&c| c));
        let div = build_divergence_grid(shape, 100).unwrap();
        assert_eq!(div.len(), 12);
        assert!(div.as_slice().iter().all(|&d| d == 99));
        assert!(build_divergence_grid(shape, 0).is_err());
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Plane::from_vec(Shape::new(2, 2), vec![0u32; 3]).is_err());
        assert!(Plane::from_vec(Shape::new(2, 2), vec![0u32; 4]).is_ok());
    }

    #[test]
    fn nearest_pixel_round_trips_through_pixel_to_point() {
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.5, 1.5, 1.0, 10, 10).unwrap();
        for (column, row) in iproduct!(0..10, 0..10) {
            let point = vp.pixel_to_point(Pixel(column, row)).unwrap();
            assert_eq!(vp.nearest_pixel(point), Some(Pixel(column, row)));
        }
        assert_eq!(vp.nearest_pixel(Complex64::new(-1.5, -1.5)), Some(Pixel(0, 0)));
        assert_eq!(vp.nearest_pixel(Complex64::new(2.0, 0.0)), None);
        assert_eq!(vp.pixel_to_point(Pixel(10, 0)), None);
    }

    #[test]
    fn nearest_pixel_refuses_non_finite_points() {
        let vp = Viewport::new(Complex64::new(0.0, 0.0), 1.5, 1.5, 1.0, 10, 10).unwrap();
        let nan = std::f64::NAN;
        let inf = std::f64::INFINITY;
        assert_eq!(vp.nearest_pixel(Complex64::new(nan, 0.0)), None);
        assert_eq!(vp.nearest_pixel(Complex64::new(0.0, nan)), None);
        assert_eq!(vp.nearest_pixel(Complex64::new(inf, 0.0)), None);
        assert_eq!(vp.nearest_pixel(Complex64::new(0.0, -inf)), None);
    }
}
