//! Adder Example
//!
//! A headless version of a classic bring-up panel: two rows of four switches
//! drive the inputs of a 4-bit adder, and a row of five LEDs shows its sum.
//!
//! ```text
//! nibble1 ──outgoing──► ConsumerMonitor ──► A ─┐
//!                                              ├─► adder ──► X ──► ProducerMonitor ──► LEDs
//! nibble2 ──outgoing──► ConsumerMonitor ──► B ─┘
//! ```
//!
//! The "simulation" here is a task that recomputes `X = A + B` whenever A or B
//! changes. The frame loop ticks at 60 Hz, feeds scripted switch flips to the
//! banks, drains the sum monitor's queue into the LED bank and prints the
//! panel. No monitor ever waits on the frame loop, and the frame loop never
//! waits on the simulation.

use std::{future::Future, time::Duration};

use bitbridge::{
    BankConfig, BitBank, BitCell, ConsumerMonitor, Edge, InputEvent, ProducerMonitor, ReadBinstr,
    Result, Signal, SwitchableBitBank, WriteInteger,
};

const NIBBLE_BITS: usize = 4;
const FRAME: Duration = Duration::from_millis(16);

/// Device under test: a combinational adder.
fn adder(a: Signal, b: Signal, x: Signal) -> impl Future<Output = Result> + Send {
    let (mut on_a, mut on_b) = (a.subscribe(), b.subscribe());
    async move {
        loop {
            tokio::select! {
                res = on_a.changed() => res?,
                res = on_b.changed() => res?,
            };
            x.write(a.read() + b.read());
        }
    }
}

/// Switch flips for each frame: (bank, input events).
fn script(frame: usize) -> Option<(usize, Vec<InputEvent>)> {
    match frame {
        2 => Some((1, vec![InputEvent::Toggle(0), InputEvent::Toggle(2)])),
        5 => Some((2, vec![InputEvent::Toggle(1)])),
        8 => Some((2, vec![InputEvent::Toggle(3)])),
        11 => Some((1, vec![InputEvent::Toggle(3)])),
        _ => None,
    }
}

fn row(bits: &[bool], on: char, off: char) -> String {
    bits.iter().map(|b| if *b { on } else { off }).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let a = Signal::new("A", NIBBLE_BITS)?;
    let b = Signal::new("B", NIBBLE_BITS)?;
    let x = Signal::new("X", NIBBLE_BITS + 1)?;

    let mut nibble1 =
        SwitchableBitBank::new(&BankConfig::new(NIBBLE_BITS).with_label("nibble1"))?.with_listener(
            |bank: &SwitchableBitBank, cell: &BitCell| {
                println!("  {} flipped {cell}", bank.label());
            },
        );
    let mut nibble2 = SwitchableBitBank::new(&BankConfig::new(NIBBLE_BITS).with_label("nibble2"))?;
    let mut sum = BitBank::from_config(&BankConfig::new(NIBBLE_BITS + 1).with_label("sum"))?;

    let circuit = tokio::spawn(adder(a.clone(), b.clone(), x.clone()));

    let mut sim_sum_monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge).with_label("X");
    let mut gui_nibble1_monitor =
        ConsumerMonitor::new(a.clone(), WriteInteger, nibble1.outgoing().clone()).with_label("A");
    let mut gui_nibble2_monitor =
        ConsumerMonitor::new(b.clone(), WriteInteger, nibble2.outgoing().clone()).with_label("B");

    sim_sum_monitor.start()?;
    gui_nibble1_monitor.start()?;
    gui_nibble2_monitor.start()?;

    let mut ticker = tokio::time::interval(FRAME);
    for frame in 0..16 {
        ticker.tick().await;

        if let Some((bank, events)) = script(frame) {
            match bank {
                1 => nibble1.update(&events)?,
                _ => nibble2.update(&events)?,
            }
        }

        for bits in sim_sum_monitor.values().drain() {
            sum.set_state_from_bigendian_string(&bits)?;
        }

        println!(
            "frame {frame:2}  A {}  B {}  X {} = {}",
            row(&nibble1.indicators().get_state_by_position(), '●', '○'),
            row(&nibble2.indicators().get_state_by_position(), '●', '○'),
            row(&sum.get_state_by_position(), '●', '○'),
            sum.to_integer(),
        );
    }

    gui_nibble2_monitor.stop().await?;
    gui_nibble1_monitor.stop().await?;
    sim_sum_monitor.stop().await?;
    circuit.abort();

    println!("Done");
    Ok(())
}
