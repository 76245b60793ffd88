//! SPH smoothing kernels.
//!
//! Provides the poly6, spiky-gradient and viscosity-Laplacian kernels of
//! Mueller et al. (2003) and the C2-continuous surface-tension kernel of
//! Akinci et al. (2013). All evaluators return the *unnormalized* polynomial
//! part; the normalization constants are precomputed once per kernel radius
//! and exposed so callers can multiply them in after accumulating over a
//! neighbourhood. Every kernel vanishes outside `[0, h]`.

use std::f32::consts::PI;

use glam::Vec3;

/// Precomputed kernel evaluators for a fixed smoothing radius `h`.
#[derive(Debug, Clone, Copy)]
pub struct Kernels {
    h: f32,
    h2: f32,
    /// Normalization of the poly6 kernel: `315 / (64 pi h^9)`.
    pub poly6_constant: f32,
    /// Normalization of the poly6 gradient: `-945 / (32 pi h^9)`.
    pub poly6_grad_constant: f32,
    /// Normalization of the spiky-kernel gradient: `-45 / (pi h^6)`.
    pub spiky_grad_constant: f32,
    /// Normalization of the viscosity-kernel Laplacian: `45 / (pi h^6)`.
    pub viscosity_laplace_constant: f32,
    /// Normalization of the surface-tension kernel: `32 / (pi h^9)`.
    pub surface_tension_constant: f32,
    /// Near-branch offset of the surface-tension kernel: `h^6 / 64`.
    surface_tension_offset: f32,
}

impl Kernels {
    /// Precompute all normalization constants for kernel radius `h`.
    pub fn new(h: f32) -> Self {
        let h2 = h * h;
        let h6 = h2 * h2 * h2;
        let h9 = h6 * h2 * h;
        Self {
            h,
            h2,
            poly6_constant: 315.0 / (64.0 * PI * h9),
            poly6_grad_constant: -945.0 / (32.0 * PI * h9),
            spiky_grad_constant: -45.0 / (PI * h6),
            viscosity_laplace_constant: 45.0 / (PI * h6),
            surface_tension_constant: 32.0 / (PI * h9),
            surface_tension_offset: h6 / 64.0,
        }
    }

    /// Kernel radius `h`.
    pub fn radius(&self) -> f32 {
        self.h
    }

    /// Squared kernel radius `h^2`.
    pub fn radius_sq(&self) -> f32 {
        self.h2
    }

    /// Poly6 kernel `(h^2 - r^2)^3` at squared distance `r_sq`.
    #[inline]
    pub fn poly6(&self, r_sq: f32) -> f32 {
        if r_sq >= self.h2 {
            return 0.0;
        }
        let d = self.h2 - r_sq;
        d * d * d
    }

    /// Poly6 gradient `r (h^2 - r^2)^2` for the displacement `r` with squared
    /// norm `r_sq`.
    #[inline]
    pub fn poly6_grad(&self, r: Vec3, r_sq: f32) -> Vec3 {
        if r_sq >= self.h2 {
            return Vec3::ZERO;
        }
        let d = self.h2 - r_sq;
        r * (d * d)
    }

    /// Spiky-kernel gradient `(r / |r|) (h - |r|)^2` for the displacement `r`
    /// with norm `r_norm`. Zero for overlapping particles.
    #[inline]
    pub fn spiky_grad(&self, r: Vec3, r_norm: f32) -> Vec3 {
        if r_norm >= self.h || r_norm <= 0.0 {
            return Vec3::ZERO;
        }
        let d = self.h - r_norm;
        r * (d * d / r_norm)
    }

    /// Viscosity-kernel Laplacian `h - |r|` at distance `r_norm`.
    #[inline]
    pub fn viscosity_laplace(&self, r_norm: f32) -> f32 {
        if r_norm >= self.h {
            return 0.0;
        }
        self.h - r_norm
    }

    /// Surface-tension kernel of Akinci et al., piecewise on `|r| <= h/2`:
    ///
    /// ```text
    /// C(r) = (h - r)^3 r^3                 for h/2 < r <= h
    /// C(r) = 2 (h - r)^3 r^3 - h^6 / 64    for 0 <= r <= h/2
    /// ```
    #[inline]
    pub fn surface_tension(&self, r_norm: f32) -> f32 {
        if r_norm >= self.h {
            return 0.0;
        }
        let d = self.h - r_norm;
        let term = d * d * d * r_norm * r_norm * r_norm;
        if 2.0 * r_norm > self.h {
            term
        } else {
            2.0 * term - self.surface_tension_offset
        }
    }
}
