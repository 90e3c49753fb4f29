//! Particle simulation behind the rain, snow and wind effects

use super::EffectKind;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    /// Vertical speed per step (rain, thunder, snow)
    pub speed: f64,
    pub size: f64,
    pub opacity: f64,
    /// Horizontal speed per step (wind, snow)
    pub vx: f64,
    /// Vertical speed per step for wind particles
    pub vy: f64,
}

/// A fixed-size field of particles advanced one step at a time
pub struct ParticleSystem {
    kind: EffectKind,
    width: f64,
    height: f64,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleSystem {
    #[must_use]
    pub fn new(kind: EffectKind, width: f64, height: f64) -> Self {
        Self::with_rng(kind, width, height, StdRng::seed_from_u64(rand::random()))
    }

    /// Deterministic system for previews and tests
    #[must_use]
    pub fn seeded(kind: EffectKind, width: f64, height: f64, seed: u64) -> Self {
        Self::with_rng(kind, width, height, StdRng::seed_from_u64(seed))
    }

    fn with_rng(kind: EffectKind, width: f64, height: f64, rng: StdRng) -> Self {
        let mut system = Self {
            kind,
            width: width.max(1.0),
            height: height.max(1.0),
            particles: Vec::new(),
            rng,
        };
        system.populate();
        system
    }

    #[must_use]
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Switch to another effect, discarding the current particles
    pub fn change(&mut self, kind: EffectKind) {
        self.clear();
        self.kind = kind;
        self.populate();
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    fn populate(&mut self) {
        let count = self.kind.style().particle_count;
        let particles: Vec<Particle> = (0..count).map(|_| self.spawn()).collect();
        self.particles = particles;
    }

    fn spawn(&mut self) -> Particle {
        let mut particle = Particle {
            x: self.rng.random_range(0.0..self.width),
            y: self.rng.random_range(-100.0..0.0),
            speed: self.rng.random_range(2.0..5.0),
            size: self.rng.random_range(1.0..4.0),
            opacity: self.rng.random_range(0.4..1.0),
            vx: 0.0,
            vy: 0.0,
        };

        match self.kind {
            EffectKind::Wind => {
                particle.vx = self.rng.random_range(1.0..3.0);
                particle.vy = self.rng.random_range(0.5..1.5);
            }
            EffectKind::Snow => {
                particle.vx = self.rng.random_range(-0.5..0.5);
                particle.speed = self.rng.random_range(0.5..1.5);
            }
            _ => {}
        }
        particle
    }

    /// Advance every particle by one step and respawn the ones that left
    /// the field.
    pub fn step(&mut self) {
        let kind = self.kind;
        let (width, height) = (self.width, self.height);

        for index in 0..self.particles.len() {
            let drift = if kind == EffectKind::Snow {
                self.rng.random_range(-0.01..0.01)
            } else {
                0.0
            };

            let particle = &mut self.particles[index];
            match kind {
                EffectKind::Wind => {
                    particle.x += particle.vx;
                    particle.y += particle.vy;
                }
                EffectKind::Snow => {
                    particle.x += particle.vx;
                    particle.y += particle.speed;
                    particle.vx += drift;
                }
                _ => particle.y += particle.speed,
            }

            let gone = particle.y > height + 10.0
                || (kind == EffectKind::Wind && particle.x > width + 10.0);
            if gone {
                let fresh = self.spawn();
                self.particles[index] = fresh;
            }
        }
    }
}
