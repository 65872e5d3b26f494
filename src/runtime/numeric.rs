//! Numeric helpers behind the math blocks.
//!
//! [`Pid`] and [`Smoother`] carry state between executions and are kept in
//! per-block side tables of the [`RuntimeContext`](super::context::RuntimeContext).
//! The remaining functions are pure.

use std::collections::VecDeque;

/// Duty cycle bounds every computed motor output is clamped to.
pub const DUTY_MIN: f64 = -100.0;
pub const DUTY_MAX: f64 = 100.0;

pub fn clamp_duty(duty: f64) -> f64 {
    duty.clamp(DUTY_MIN, DUTY_MAX)
}

/// PID controller with error, integral and derivative state seeded at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Pid {
            kp,
            ki,
            kd,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// One controller step.
    ///
    /// `output = Kp*error + Ki*integral + Kd*(error - prev_error)/dt`, then
    /// `integral += error*dt`. The output is clamped to the duty-cycle range.
    /// A non-positive `dt` skips the derivative and integral terms.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let derivative = if dt > 0.0 {
            (error - self.prev_error) / dt
        } else {
            0.0
        };
        let output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        if dt > 0.0 {
            self.integral += error * dt;
        }
        self.prev_error = error;
        clamp_duty(output)
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// Trailing window mean over the last `capacity` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Smoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl Smoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Smoother {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a sample and return the mean of the window.
    pub fn push(&mut self, sample: f64) -> f64 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        self.mean().unwrap_or(sample)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Hypotenuse of a right triangle with legs `a` and `b`.
pub fn pythagoras(a: f64, b: f64) -> f64 {
    a.hypot(b)
}

/// Distance covered at constant `speed` over `seconds`.
pub fn path_length(speed: f64, seconds: f64) -> f64 {
    speed * seconds
}

/// Average speed over a measured run. `None` when no time elapsed.
pub fn speed_from_distance_time(distance: f64, seconds: f64) -> Option<f64> {
    (seconds > 0.0).then(|| distance / seconds)
}
