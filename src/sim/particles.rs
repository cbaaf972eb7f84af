//! Visual-effect particles
//!
//! Particles never affect gameplay. The system owns every particle, ages
//! them one tick per update and culls them at the end of their lifespan.
//! Emitters shrink or skip their burst near the cap instead of failing.

use glam::Vec2;
use rand::Rng;

use crate::consts::MAX_PARTICLES;

/// Horizontal velocity retained each tick
pub const PARTICLE_FRICTION: f32 = 0.99;
/// Downward acceleration added each tick
pub const PARTICLE_GRAVITY: f32 = 0.1;

/// Named colours used by the emitters (0xRRGGBB)
pub mod palette {
    pub const MILK: u32 = 0xFFFFFF;
    pub const GOLD: u32 = 0xFFD700;
    pub const SHIELD: u32 = 0x00FFFF;
    pub const FIRE: u32 = 0xFF5500;
    pub const CRUMB: u32 = 0xF5DEB3;
    pub const CHOCOLATE: [u32; 4] = [0x3D2314, 0x4A2C17, 0x5C3A21, 0x6B4226];
    pub const MAGNET: [u32; 3] = [0x00FFFF, 0x1E90FF, 0x4169E1];
}

/// A single particle
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// 0xRRGGBB
    pub color: u32,
    /// Ticks lived so far
    pub age: u32,
    /// Ticks until removal
    pub lifespan: f32,
}

impl Particle {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32, color: u32, lifespan: f32) -> Self {
        Self {
            pos,
            vel,
            radius,
            color,
            age: 0,
            lifespan,
        }
    }

    /// Advance one tick. Returns false once the particle has expired.
    pub fn update(&mut self) -> bool {
        self.pos += self.vel;
        self.vel.y += PARTICLE_GRAVITY;
        self.vel.x *= PARTICLE_FRICTION;
        self.age += 1;
        self.is_alive()
    }

    pub fn is_alive(&self) -> bool {
        (self.age as f32) < self.lifespan
    }

    /// 1 at birth, 0 at the end of the lifespan
    pub fn opacity(&self) -> f32 {
        (1.0 - self.age as f32 / self.lifespan).clamp(0.0, 1.0)
    }
}

/// Shape of a radial burst
struct Burst {
    speed: (f32, f32),
    radius: (f32, f32),
    lifespan: (f32, f32),
    /// Added to the vertical velocity (negative = up)
    bias_y: f32,
}

const SPLASH: Burst = Burst {
    speed: (1.0, 4.0),
    radius: (2.0, 5.0),
    lifespan: (30.0, 60.0),
    bias_y: -2.0,
};

const EXPLOSION: Burst = Burst {
    speed: (2.0, 6.0),
    radius: (2.0, 6.0),
    lifespan: (40.0, 60.0),
    bias_y: 0.0,
};

const TRAIL: Burst = Burst {
    speed: (0.5, 1.5),
    radius: (1.0, 3.0),
    lifespan: (20.0, 30.0),
    bias_y: 1.0,
};

/// Particles emitted per trail call
pub const TRAIL_COUNT: usize = 3;
/// Smallest burst a splash or explosion emits (still capped)
pub const MIN_BURST: usize = 5;

/// Owner of all free-floating particles
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    max_particles: usize,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(MAX_PARTICLES)
    }
}

impl ParticleSystem {
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles),
            max_particles,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Change the cap (settings change). Excess particles are dropped oldest first.
    pub fn set_max_particles(&mut self, max: usize) {
        self.max_particles = max;
        if self.particles.len() > max {
            let excess = self.particles.len() - max;
            self.particles.drain(..excess);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Age every particle by one tick and drop the expired ones
    pub fn update(&mut self) {
        self.particles.retain_mut(|p| p.update());
    }

    /// Add one particle if there is room
    pub fn push(&mut self, particle: Particle) -> bool {
        if self.particles.len() < self.max_particles {
            self.particles.push(particle);
            true
        } else {
            false
        }
    }

    /// Radially symmetric burst with a slight upward bias (pickups, flaps)
    pub fn emit_splash(&mut self, rng: &mut impl Rng, pos: Vec2, color: u32, count: usize) {
        let count = self.burst_count(count);
        self.emit_burst(rng, pos, &SPLASH, count, |_| color);
    }

    /// Fast unbiased burst (collisions, shield breaks, pickups of power-ups)
    pub fn emit_explosion(&mut self, rng: &mut impl Rng, pos: Vec2, color: u32, count: usize) {
        let count = self.burst_count(count);
        self.emit_burst(rng, pos, &EXPLOSION, count, |_| color);
    }

    /// Explosion of mixed chocolate colours at an impact point
    pub fn emit_debris(&mut self, rng: &mut impl Rng, pos: Vec2, count: usize) {
        let count = self.burst_count(count);
        let colors: Vec<u32> = (0..count)
            .map(|_| palette::CHOCOLATE[rng.random_range(0..palette::CHOCOLATE.len())])
            .collect();
        self.emit_burst(rng, pos, &EXPLOSION, count, |i| colors[i]);
    }

    /// Slow, downward-drifting trail (fire mode). Skipped entirely near the cap.
    pub fn emit_trail(&mut self, rng: &mut impl Rng, pos: Vec2, color: u32) {
        if self.particles.len() as f32 > self.max_particles as f32 * 0.9 {
            return;
        }
        self.emit_burst(rng, pos, &TRAIL, TRAIL_COUNT, |_| color);
    }

    /// A few sparks drifting from `from` toward `to` (magnet pull)
    pub fn emit_magnetic(&mut self, rng: &mut impl Rng, from: Vec2, to: Vec2) {
        for _ in 0..3 {
            // Bias toward the source end of the path
            let t = rng.random::<f32>() * 0.7;
            let pos = from + (to - from) * t;
            let dir = (to - pos).normalize_or_zero();
            let speed = 1.0 + rng.random::<f32>() * 2.0;
            let radius = 1.0 + rng.random::<f32>() * 2.0;
            let lifespan = 10.0 + rng.random::<f32>() * 10.0;
            let color = palette::MAGNET[rng.random_range(0..palette::MAGNET.len())];
            if !self.push(Particle::new(pos, dir * speed, radius, color, lifespan)) {
                break;
            }
        }
    }

    /// Halve the request past 80% load, keep at least a few
    fn burst_count(&self, requested: usize) -> usize {
        let count = if self.particles.len() as f32 > self.max_particles as f32 * 0.8 {
            requested / 2
        } else {
            requested
        };
        count.max(MIN_BURST)
    }

    fn emit_burst(
        &mut self,
        rng: &mut impl Rng,
        pos: Vec2,
        burst: &Burst,
        count: usize,
        color_of: impl Fn(usize) -> u32,
    ) {
        for i in 0..count {
            if self.particles.len() >= self.max_particles {
                break;
            }
            let angle = rng.random::<f32>() * std::f32::consts::TAU;
            let speed = lerp(burst.speed, rng.random());
            let vel = Vec2::new(angle.cos() * speed, angle.sin() * speed + burst.bias_y);
            let radius = lerp(burst.radius, rng.random());
            let lifespan = lerp(burst.lifespan, rng.random());
            self.particles
                .push(Particle::new(pos, vel, radius, color_of(i), lifespan));
        }
    }
}

#[inline]
fn lerp((lo, hi): (f32, f32), t: f32) -> f32 {
    lo + (hi - lo) * t
}
