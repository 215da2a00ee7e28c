use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const GRAVITY: f64 = 9.0;
const SPARK_SYMBOLS: [char; 5] = ['*', '+', '.', 'o', '\''];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Rising shell that bursts at its apex
    Rocket,
    Spark,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: char,
    pub color_index: usize,
    pub kind: ParticleKind,
    pub age: f64,
    pub max_age: f64,
}

impl Particle {
    fn rocket<R: Rng>(rng: &mut R, width: f64, height: f64) -> Self {
        Self {
            x: rng.gen_range(width * 0.15..width * 0.85),
            y: height,
            vel_x: rng.gen_range(-1.5..1.5),
            // apex lands between 40% and 80% of the way up
            vel_y: -(2.0 * GRAVITY * height * rng.gen_range(0.4..0.8)).sqrt(),
            symbol: '|',
            color_index: rng.gen_range(0..7),
            kind: ParticleKind::Rocket,
            age: 0.0,
            max_age: 3.0,
        }
    }

    fn spark<R: Rng>(rng: &mut R, x: f64, y: f64, angle: f64, color_index: usize) -> Self {
        let speed = rng.gen_range(4.0..9.0);
        Self {
            x,
            y,
            // cells are about twice as tall as wide
            vel_x: angle.cos() * speed * 2.0,
            vel_y: angle.sin() * speed,
            symbol: *SPARK_SYMBOLS.choose(&mut *rng).unwrap_or(&'*'),
            color_index,
            kind: ParticleKind::Spark,
            age: 0.0,
            max_age: rng.gen_range(0.8..1.6),
        }
    }

    /// Returns false once the particle should be dropped.
    fn update(&mut self, dt: f64) -> bool {
        self.x += self.vel_x * dt;
        self.y += self.vel_y * dt;
        self.vel_y += GRAVITY * dt;
        if self.kind == ParticleKind::Spark {
            self.vel_x *= 0.96;
        }
        self.age += dt;
        self.age < self.max_age
    }

    fn should_burst(&self) -> bool {
        self.kind == ParticleKind::Rocket && self.vel_y >= 0.0
    }
}

/// Fireworks shown over the end screen after a good enough score.
#[derive(Debug)]
pub struct Fireworks {
    pub particles: Vec<Particle>,
    pub duration: Duration,
    pub width: f64,
    pub height: f64,
    elapsed: Duration,
    next_launch: Duration,
    active: bool,
    rng: StdRng,
}

impl Fireworks {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            particles: Vec::new(),
            duration: Duration::from_secs(4),
            width: 80.0,
            height: 24.0,
            elapsed: Duration::ZERO,
            next_launch: Duration::ZERO,
            active: false,
            rng,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self, width: u16, height: u16) {
        self.particles.clear();
        self.width = width.max(10) as f64;
        self.height = height.max(6) as f64;
        self.elapsed = Duration::ZERO;
        self.next_launch = Duration::ZERO;
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.particles.clear();
    }

    /// Advance by `dt`. Launches stop at `duration`; the show ends once the
    /// last spark fades.
    pub fn update(&mut self, dt: Duration) {
        if !self.active {
            return;
        }
        self.elapsed += dt;

        while self.elapsed < self.duration && self.next_launch <= self.elapsed {
            let rocket = Particle::rocket(&mut self.rng, self.width, self.height);
            self.particles.push(rocket);
            self.next_launch += Duration::from_millis(self.rng.gen_range(250..600));
        }

        let step = dt.as_secs_f64();
        let mut bursts = Vec::new();
        let (width, height) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(step);
            if p.should_burst() {
                bursts.push((p.x, p.y, p.color_index));
                return false;
            }
            let off_screen = p.y > height + 2.0 || p.x < -2.0 || p.x > width + 2.0;
            alive && !off_screen
        });

        for (x, y, color) in bursts {
            let count = self.rng.gen_range(14..22);
            for i in 0..count {
                let angle = i as f64 / count as f64 * std::f64::consts::TAU;
                let spark = Particle::spark(&mut self.rng, x, y, angle, color);
                self.particles.push(spark);
            }
        }

        if self.elapsed >= self.duration && self.particles.is_empty() {
            self.active = false;
        }
    }

    /// Particles inside the drawable area, as cell coordinates.
    pub fn visible(&self) -> impl Iterator<Item = (u16, u16, &Particle)> + '_ {
        self.particles.iter().filter_map(|p| {
            if p.x < 0.0 || p.y < 0.0 || p.x >= self.width || p.y >= self.height {
                return None;
            }
            Some((p.x as u16, p.y as u16, p))
        })
    }
}

impl Default for Fireworks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(100);

    #[test]
    fn test_inactive_until_started() {
        let mut fireworks = Fireworks::seeded(1);
        fireworks.update(FRAME);
        assert!(!fireworks.is_active());
        assert!(fireworks.particles.is_empty());
    }

    #[test]
    fn test_rockets_burst_into_sparks() {
        let mut fireworks = Fireworks::seeded(3);
        fireworks.start(80, 24);
        fireworks.update(FRAME);
        assert!(fireworks
            .particles
            .iter()
            .any(|p| p.kind == ParticleKind::Rocket));

        let mut saw_sparks = false;
        for _ in 0..30 {
            fireworks.update(FRAME);
            saw_sparks |= fireworks
                .particles
                .iter()
                .any(|p| p.kind == ParticleKind::Spark);
        }
        assert!(saw_sparks);
    }

    #[test]
    fn test_show_ends_after_duration() {
        let mut fireworks = Fireworks::seeded(5);
        fireworks.start(60, 20);
        for _ in 0..200 {
            fireworks.update(FRAME);
        }
        assert!(!fireworks.is_active());
        assert!(fireworks.particles.is_empty());
    }

    #[test]
    fn test_spark_falls_under_gravity() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut spark = Particle::spark(&mut rng, 10.0, 10.0, 0.0, 2);
        let vel_y = spark.vel_y;
        spark.update(0.1);
        assert!(spark.vel_y > vel_y);
        assert!(spark.x > 10.0);
    }

    #[test]
    fn test_visible_within_bounds() {
        let mut fireworks = Fireworks::seeded(7);
        fireworks.start(40, 12);
        for _ in 0..15 {
            fireworks.update(FRAME);
        }
        assert!(fireworks.visible().all(|(x, y, _)| x < 40 && y < 12));
    }

    #[test]
    fn test_stop_clears() {
        let mut fireworks = Fireworks::seeded(2);
        fireworks.start(80, 24);
        fireworks.update(FRAME);
        fireworks.stop();
        assert!(!fireworks.is_active());
        assert!(fireworks.particles.is_empty());
    }
}
