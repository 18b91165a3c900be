//! Local pub/sub example
//!
//! Run with: cargo run --example pubsub
//!
//! Publishes a `Person` record every 500 ms to a hub with two consumers.
//! Each consumer owns a dispatcher thread and prints what it receives at its
//! own pace; the slow one falls behind without holding up the publisher.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BufMut};
use fanout_rs::{Dispatcher, DispatcherConfig, FixedLayout, Hub, Worker};

#[derive(Debug, Clone, Copy)]
struct Person {
    name: [u8; 30],
    age: i32,
    is_adult: bool,
}

impl Person {
    fn new(name: &str, age: i32) -> Self {
        let mut buf = [0u8; 30];
        let len = name.len().min(buf.len());
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: buf,
            age,
            is_adult: age >= 18,
        }
    }

    fn name(&self) -> &str {
        let end = self.name.iter().position(|b| *b == 0).unwrap_or(self.name.len());
        std::str::from_utf8(&self.name[..end]).unwrap_or("?")
    }
}

impl FixedLayout for Person {
    const SIZE: usize = 30 + 4 + 1;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.name);
        buf.put_i32_le(self.age);
        buf.put_u8(u8::from(self.is_adult));
    }

    fn decode<B: Buf>(buf: &mut B) -> Self {
        let mut name = [0u8; 30];
        buf.copy_to_slice(&mut name);
        Self {
            name,
            age: buf.get_i32_le(),
            is_adult: buf.get_u8() != 0,
        }
    }
}

/// Prints every person it is handed, sleeping `delay` after each
struct Reporter {
    label: &'static str,
    delay: Duration,
    dispatcher: Arc<Dispatcher>,
    hub: Arc<Hub>,
}

impl Reporter {
    fn new(label: &'static str, delay: Duration, hub: Arc<Hub>) -> Self {
        let config = DispatcherConfig::default().name(format!("reporter-{}", label));
        Self {
            label,
            delay,
            dispatcher: Arc::new(Dispatcher::with_config(config)),
            hub,
        }
    }
}

impl Worker for Reporter {
    fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn init(&mut self) -> fanout_rs::Result<()> {
        let label = self.label;
        let delay = self.delay;
        self.hub.subscribe_typed(&self.dispatcher, move |person: Person| {
            println!(
                "[{}] got {} aged {} ({})",
                label,
                person.name(),
                person.age,
                if person.is_adult { "adult" } else { "kid" }
            );
            std::thread::sleep(delay);
        })?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=debug".parse()?),
        )
        .init();

    let hub = Arc::new(Hub::of::<Person>());

    let mut fast = Reporter::new("fast", Duration::ZERO, Arc::clone(&hub));
    let mut slow = Reporter::new("slow", Duration::from_millis(1200), Arc::clone(&hub));
    fast.init()?;
    slow.init()?;
    fast.start()?;
    slow.start()?;

    let people = [("liran", 12), ("schwartz", 33), ("yess", 44)];
    for (i, (name, age)) in people.iter().cycle().take(9).enumerate() {
        hub.write(&Person::new(name, *age))?;
        println!("published #{} ({} in history)", i, hub.history().len());
        std::thread::sleep(Duration::from_millis(500));
    }

    let last: Person = hub.get_last()?;
    println!("last published: {}", last.name());
    println!("slow reporter still has {} pending", slow.dispatcher().pending());

    fast.stop();
    slow.stop();
    println!("fast: {:?}", fast.dispatcher().stats());
    println!("slow: {:?}", slow.dispatcher().stats());
    Ok(())
}
