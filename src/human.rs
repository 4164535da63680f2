//! Human-like interaction timing
//!
//! Two layers of realism: per-gesture simulation (curved mouse paths,
//! per-keystroke delays) and run-level pacing, a random pause wrapped
//! around every simulated action so the overall rhythm doesn't read as
//! scripted. Behavior-based bot detection keys on both.

use std::cell::RefCell;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tokio::time::sleep;

use crate::cdp::{KeyEventType, MouseButton, MouseEventType, Session};
use crate::error::Result;

thread_local! {
    static RNG: RefCell<rand::rngs::ThreadRng> = RefCell::new(rand::thread_rng());
}

fn random_range(min: u64, max: u64) -> u64 {
    RNG.with(|rng| rng.borrow_mut().gen_range(min..=max))
}

fn random_f64_range(min: f64, max: f64) -> f64 {
    RNG.with(|rng| rng.borrow_mut().gen_range(min..max))
}

/// Pause bounds applied before and after every simulated user action.
///
/// Sampled uniformly from `[min_ms, max_ms]`. The default matches human
/// think-time between form interactions; shortening it defeats the point,
/// so treat the bounds as behavior, not tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 1500,
        }
    }
}

impl Pacing {
    /// Draw one pause from the configured range
    pub fn sample(&self) -> Duration {
        Duration::from_millis(random_range(self.min_ms, self.max_ms))
    }

    /// Suspend for one sampled pause
    pub async fn pause(&self) {
        sleep(self.sample()).await;
    }

    /// Run an action with a sampled pause before and after it.
    ///
    /// An action that fails skips the trailing pause; the error is what
    /// matters at that point.
    pub async fn around<F, Fut, T>(&self, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.pause().await;
        let value = action().await?;
        self.pause().await;
        Ok(value)
    }
}

type Point = (f64, f64);

/// Stack-allocated storage for typical mouse paths
type PointVec = SmallVec<[Point; 64]>;

/// Generate a cubic Bezier path for natural mouse movement
#[inline]
fn bezier_curve(start: Point, end: Point, num_points: usize) -> PointVec {
    let num_points = num_points.max(2);

    let cp1 = (
        start.0 + (end.0 - start.0) * random_f64_range(0.2, 0.4) + random_f64_range(-50.0, 50.0),
        start.1 + (end.1 - start.1) * random_f64_range(0.0, 0.3) + random_f64_range(-50.0, 50.0),
    );
    let cp2 = (
        start.0 + (end.0 - start.0) * random_f64_range(0.6, 0.8) + random_f64_range(-50.0, 50.0),
        start.1 + (end.1 - start.1) * random_f64_range(0.7, 1.0) + random_f64_range(-50.0, 50.0),
    );

    let mut points = PointVec::new();

    for i in 0..num_points {
        let t = i as f64 / (num_points - 1) as f64;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * start.0 + 3.0 * mt2 * t * cp1.0 + 3.0 * mt * t2 * cp2.0 + t3 * end.0;
        let y = mt3 * start.1 + 3.0 * mt2 * t * cp1.1 + 3.0 * mt * t2 * cp2.1 + t3 * end.1;

        points.push((x, y));
    }

    points
}

/// Per-gesture human simulation over a CDP session
pub struct Human<'a> {
    session: &'a Session,
}

impl<'a> Human<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Move the mouse along a curved path to the target and click it
    pub async fn move_and_click(&self, target_x: f64, target_y: f64) -> Result<()> {
        let start_x = random_f64_range(100.0, 800.0);
        let start_y = random_f64_range(100.0, 600.0);

        let distance = ((target_x - start_x).powi(2) + (target_y - start_y).powi(2)).sqrt();
        let num_points = (distance / 10.0).clamp(10.0, 50.0) as usize;

        let path = bezier_curve((start_x, start_y), (target_x, target_y), num_points);

        for (x, y) in path {
            self.session
                .dispatch_mouse_event(MouseEventType::MouseMoved, x, y, None, None)
                .await?;
            sleep(Duration::from_millis(random_range(5, 25))).await;
        }

        sleep(Duration::from_millis(random_range(50, 150))).await;

        // Click with slight jitter off dead center
        let click_x = target_x + random_f64_range(-2.0, 2.0);
        let click_y = target_y + random_f64_range(-2.0, 2.0);

        self.session
            .dispatch_mouse_event(
                MouseEventType::MousePressed,
                click_x,
                click_y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await?;

        sleep(Duration::from_millis(random_range(50, 120))).await;

        self.session
            .dispatch_mouse_event(
                MouseEventType::MouseReleased,
                click_x,
                click_y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await?;

        sleep(Duration::from_millis(random_range(30, 100))).await;

        Ok(())
    }

    /// Type text with per-keystroke timing
    pub async fn type_text(&self, text: &str) -> Result<()> {
        for ch in text.chars() {
            self.session
                .dispatch_key_event(KeyEventType::Char, None, Some(&ch.to_string()), None)
                .await?;

            // Spaces and punctuation get the longer inter-key gaps
            let delay = if ch == ' ' {
                random_range(80, 180)
            } else if ch.is_ascii_punctuation() {
                random_range(100, 200)
            } else {
                random_range(50, 150)
            };

            sleep(Duration::from_millis(delay)).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bezier_curve_endpoints() {
        let start = (50.0, 75.0);
        let end = (200.0, 300.0);

        let points = bezier_curve(start, end, 10);

        let first = points.first().unwrap();
        assert!((first.0 - start.0).abs() < 0.001);
        assert!((first.1 - start.1).abs() < 0.001);

        let last = points.last().unwrap();
        assert!((last.0 - end.0).abs() < 0.001);
        assert!((last.1 - end.1).abs() < 0.001);
    }

    #[test]
    fn test_pacing_bounds_and_uniformity() {
        let pacing = Pacing::default();
        let samples: Vec<u64> = (0..10_000)
            .map(|_| pacing.sample().as_millis() as u64)
            .collect();

        assert!(samples.iter().all(|&ms| (500..=1500).contains(&ms)));

        let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
        assert!(
            (960.0..=1040.0).contains(&mean),
            "mean {} outside expected band",
            mean
        );

        // Uniform draws should populate both tails of the range
        let low = samples.iter().filter(|&&ms| ms < 700).count();
        let high = samples.iter().filter(|&&ms| ms > 1300).count();
        assert!(low > 1500, "lower tail underpopulated: {}", low);
        assert!(high > 1500, "upper tail underpopulated: {}", high);
    }

    #[test]
    fn test_pacing_custom_range() {
        let pacing = Pacing {
            min_ms: 1,
            max_ms: 3,
        };
        for _ in 0..100 {
            let ms = pacing.sample().as_millis() as u64;
            assert!((1..=3).contains(&ms));
        }
    }
}
