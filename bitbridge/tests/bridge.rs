use std::{future::Future, sync::Arc, time::Duration};

use bitbridge::{
    Awaiter, BankConfig, BigEndianSetter, BitBank, ConsumerMonitor, Edge, Error, InputEvent,
    MonitorQueue, ProducerMonitor, ReadBinstr, Result, Setter, SharedBitBank, Signal,
    SwitchableBitBank, WriteInteger,
};
use parking_lot::Mutex;
use tokio::{
    select,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    time::{sleep, timeout},
};

/// Signal whose changes are scripted one by one; each change carries its value.
struct Scripted {
    changes: tokio::sync::Mutex<UnboundedReceiver<u32>>,
}

impl Scripted {
    fn new() -> (Self, UnboundedSender<u32>) {
        let (tx, rx) = unbounded_channel();
        let handle = Scripted {
            changes: tokio::sync::Mutex::new(rx),
        };
        (handle, tx)
    }
}

struct NextChange;

impl Awaiter<Scripted> for NextChange {
    type Subscription = ();
    type Sample = u32;

    fn subscribe(&self, _handle: &Scripted) {}

    fn changed(
        &self,
        handle: &Scripted,
        _subscription: &mut (),
    ) -> impl Future<Output = Result<u32>> + Send {
        async move {
            handle
                .changes
                .lock()
                .await
                .recv()
                .await
                .ok_or(Error::QueueClosed)
        }
    }
}

async fn eventually(what: &str, mut done: impl FnMut() -> bool) {
    let res = timeout(Duration::from_secs(2), async {
        while !done() {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(res.is_ok(), "timed out waiting for {what}");
}

#[tokio::test]
async fn producer_to_consumer_preserves_order_under_jitter() {
    const N: u32 = 200;

    let (scripted, script) = Scripted::new();
    let latched = |value: &u32| -> Result<u32> { Ok(*value) };
    let mut producer = ProducerMonitor::new(scripted, latched, NextChange).with_label("scripted");

    let applied: Arc<Mutex<Vec<u32>>> = Arc::default();
    let mut consumer = ConsumerMonitor::new(
        applied.clone(),
        |target: &Arc<Mutex<Vec<u32>>>, v: u32| -> Result<()> {
            target.lock().push(v);
            Ok(())
        },
        producer.values().clone(),
    );

    producer.start().unwrap();
    consumer.start().unwrap();

    let driver = tokio::spawn(async move {
        for v in 1..=N {
            script.send(v).unwrap();
            let jitter = u64::from(v * 37 % 11);
            if jitter > 5 {
                sleep(Duration::from_micros(jitter * 50)).await;
            }
        }
        script
    });

    eventually("all values applied", || applied.lock().len() == N as usize).await;
    assert_eq!(*applied.lock(), (1..=N).collect::<Vec<_>>());

    consumer.stop().await.unwrap();
    producer.stop().await.unwrap();
    drop(driver.await.unwrap());
}

#[tokio::test]
async fn toggles_reach_the_signal_in_order() {
    let a = Signal::new("A", 4).unwrap();
    let bank = Arc::new(Mutex::new(
        SwitchableBitBank::new(&BankConfig::new(4).with_label("nibble1")).unwrap(),
    ));
    let outgoing = bank.lock().outgoing().clone();

    let seen: Arc<Mutex<Vec<u64>>> = Arc::default();
    let record = seen.clone();
    let mut to_sim = ConsumerMonitor::new(
        a.clone(),
        move |signal: &Signal, value: u64| -> Result<()> {
            record.lock().push(value);
            WriteInteger.set(signal, value)
        },
        outgoing,
    );
    to_sim.start().unwrap();

    bank.lock().toggle(3).unwrap();
    bank.lock().toggle(0).unwrap();
    assert_eq!(bank.lock().to_integer(), 0b1001);

    eventually("both toggles applied", || seen.lock().len() == 2).await;
    assert_eq!(*seen.lock(), vec![0b1000, 0b1001]);
    assert_eq!(a.read(), 9);
    assert!(bank.lock().outgoing().is_empty());

    to_sim.stop().await.unwrap();
}

/// Stand-in for the device under test: X = A + B.
///
/// Subscribes before returning, so no input change is missed once spawned.
fn adder(a: Signal, b: Signal, x: Signal) -> impl Future<Output = Result<()>> + Send {
    let (mut on_a, mut on_b) = (a.subscribe(), b.subscribe());
    async move {
        loop {
            select! {
                res = on_a.changed() => res?,
                res = on_b.changed() => res?,
            };
            x.write(a.read() + b.read());
        }
    }
}

#[tokio::test]
async fn adder_round_trip_updates_leds() {
    let (a, b, x) = (
        Signal::new("A", 4).unwrap(),
        Signal::new("B", 4).unwrap(),
        Signal::new("X", 5).unwrap(),
    );

    let mut nibble1 = SwitchableBitBank::new(&BankConfig::new(4)).unwrap();
    let mut nibble2 = SwitchableBitBank::new(&BankConfig::new(4)).unwrap();
    let leds = SharedBitBank::new(BitBank::new(5).unwrap());

    let circuit = tokio::spawn(adder(a.clone(), b.clone(), x.clone()));

    let mut sum_monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge).with_label("X");
    let mut led_monitor =
        ConsumerMonitor::new(leds.clone(), BigEndianSetter, sum_monitor.values().clone())
            .with_label("leds");
    let mut a_monitor = ConsumerMonitor::new(a.clone(), WriteInteger, nibble1.outgoing().clone());
    let mut b_monitor = ConsumerMonitor::new(b.clone(), WriteInteger, nibble2.outgoing().clone());

    sum_monitor.start().unwrap();
    led_monitor.start().unwrap();
    a_monitor.start().unwrap();
    b_monitor.start().unwrap();

    // 0b0101 + 0b0011
    nibble1.update(&[InputEvent::Toggle(0), InputEvent::Toggle(2)]).unwrap();
    nibble2.update(&[InputEvent::Toggle(0), InputEvent::Toggle(1)]).unwrap();

    eventually("sum shown on leds", || leds.lock().to_integer() == 8).await;
    assert_eq!(leds.lock().to_bigendian_string(), "01000");
    assert_eq!(x.read_binstr(), "01000");

    for monitor in [&mut a_monitor, &mut b_monitor] {
        monitor.stop().await.unwrap();
    }
    led_monitor.stop().await.unwrap();
    sum_monitor.stop().await.unwrap();
    circuit.abort();
}

#[tokio::test]
async fn stopped_bridge_leaves_queue_intact() {
    let a = Signal::new("A", 4).unwrap();
    let queue = MonitorQueue::new();
    let mut to_sim = ConsumerMonitor::new(a.clone(), WriteInteger, queue.clone());

    to_sim.start().unwrap();
    queue.put(3);
    eventually("first value applied", || a.read() == 3).await;
    to_sim.stop().await.unwrap();

    queue.put(4);
    queue.put(5);
    sleep(Duration::from_millis(5)).await;
    assert_eq!(a.read(), 3);

    to_sim.start().unwrap();
    eventually("backlog applied", || a.read() == 5).await;
    to_sim.stop().await.unwrap();
}

#[tokio::test]
async fn queued_backlog_round_trips_without_losing_values() {
    let a = Signal::new("A", 4).unwrap();
    let mut nibble = SwitchableBitBank::new(&BankConfig::new(4)).unwrap();

    // Toggles pile up before anything runs.
    nibble
        .update(&[InputEvent::Toggle(0), InputEvent::Toggle(1), InputEvent::Toggle(3)])
        .unwrap();

    let mut from_sim = ProducerMonitor::new(a.clone(), ReadBinstr, Edge);
    let mut to_sim = ConsumerMonitor::new(a.clone(), WriteInteger, nibble.outgoing().clone());
    from_sim.start().unwrap();
    to_sim.start().unwrap();

    eventually("every toggle echoed back", || from_sim.values().len() == 3).await;
    assert_eq!(
        from_sim.values().drain().collect::<Vec<_>>(),
        vec!["0001", "0011", "1011"]
    );

    to_sim.stop().await.unwrap();
    from_sim.stop().await.unwrap();
}
