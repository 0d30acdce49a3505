use flowcore::{Node, NodeContext, NodeError, Value};
use std::thread;
use std::time::{Duration, Instant};

/// Block for a duration, probing for termination every tick, then pass the
/// first input through
pub struct DelayNode {
    pub duration: Duration,
    pub tick: Duration,
}

impl DelayNode {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            tick: Duration::from_millis(10),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl Node for DelayNode {
    fn node_type(&self) -> &str {
        "time.delay"
    }

    fn call(&self, ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        let start = Instant::now();
        ctx.events.info(format!("Delaying for {}ms", self.duration.as_millis()));

        while start.elapsed() < self.duration {
            ctx.check_terminate()?;
            let remaining = self.duration.saturating_sub(start.elapsed());
            thread::sleep(remaining.min(self.tick));
        }
        ctx.check_terminate()?;

        Ok(inputs.first().cloned().unwrap_or_default())
    }
}
