//! Point-to-point message delivery scheduling.

use modgrid_core::{Event, Message, ScheduledEvent};
use modgrid_types::{Direction, ModuleId, SimTime};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::trace;

/// One side of a link: a module's network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub module: ModuleId,
    pub port: Direction,
}

/// A logical point-to-point channel between two module interfaces.
///
/// The link holds no queued state: it is a stateless factory that turns a
/// send into exactly one future arrival event. There is no link-level
/// buffering or congestion in this model.
#[derive(Debug, Clone, Copy)]
pub struct NetworkLink {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl NetworkLink {
    /// Produce the arrival event for one message.
    ///
    /// The event fires at `now + latency + jitter`, with jitter drawn
    /// uniformly from `[0, jitter_bound]` out of the seeded simulation RNG.
    /// With a zero jitter bound, delivery is exactly `now + latency`.
    pub fn schedule_delivery(
        &self,
        message: Message,
        latency: Duration,
        jitter_bound: Duration,
        now: SimTime,
        rng: &mut ChaCha8Rng,
    ) -> ScheduledEvent {
        let jitter = sample_jitter(jitter_bound, rng);
        let fire_at = now + latency + jitter;
        trace!(
            from = %self.from.module,
            to = %self.to.module,
            port = %self.to.port,
            fire_at = %fire_at,
            "scheduling message delivery"
        );
        ScheduledEvent::new(
            fire_at,
            Event::MessageArrival {
                to: self.to.module,
                port: self.to.port,
                message,
            },
        )
    }
}

fn sample_jitter(bound: Duration, rng: &mut ChaCha8Rng) -> Duration {
    if bound.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_micros(rng.gen_range(0..=bound.as_micros() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgrid_core::MessageKind;
    use rand::SeedableRng;

    fn test_link() -> NetworkLink {
        NetworkLink {
            from: Endpoint {
                module: ModuleId(0),
                port: Direction::PlusX,
            },
            to: Endpoint {
                module: ModuleId(1),
                port: Direction::MinusX,
            },
        }
    }

    #[test]
    fn test_zero_jitter_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let scheduled = test_link().schedule_delivery(
            Message::new(MessageKind(1), ()),
            Duration::from_micros(1_000),
            Duration::ZERO,
            SimTime::from_micros(500),
            &mut rng,
        );
        assert_eq!(scheduled.fire_at, SimTime::from_micros(1_500));
        match scheduled.event {
            Event::MessageArrival { to, port, .. } => {
                assert_eq!(to, ModuleId(1));
                assert_eq!(port, Direction::MinusX);
            }
            other => panic!("expected MessageArrival, got {other:?}"),
        }
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let latency = Duration::from_micros(1_000);
        let bound = Duration::from_micros(200);
        for _ in 0..1_000 {
            let scheduled = test_link().schedule_delivery(
                Message::new(MessageKind(1), ()),
                latency,
                bound,
                SimTime::ZERO,
                &mut rng,
            );
            let fired = scheduled.fire_at.as_micros();
            assert!((1_000..=1_200).contains(&fired), "jitter escaped: {fired}");
        }
    }

    #[test]
    fn test_same_seed_same_jitter() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(12345);
        let mut rng2 = ChaCha8Rng::seed_from_u64(12345);
        let link = test_link();
        for _ in 0..100 {
            let a = link.schedule_delivery(
                Message::new(MessageKind(1), ()),
                Duration::from_micros(100),
                Duration::from_micros(50),
                SimTime::ZERO,
                &mut rng1,
            );
            let b = link.schedule_delivery(
                Message::new(MessageKind(1), ()),
                Duration::from_micros(100),
                Duration::from_micros(50),
                SimTime::ZERO,
                &mut rng2,
            );
            assert_eq!(a.fire_at, b.fire_at, "same seed must give same jitter");
        }
    }
}
