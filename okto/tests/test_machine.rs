//! End-to-end tests through the public machine surface.
use std::time::Duration;

use okto::prelude::*;

fn cpu_period() -> Duration {
    Hz(okto::constants::CPU_FREQUENCY).into()
}

/// Steps the machine through `n` CPU periods of simulated time.
fn step_n(machine: &Machine, n: usize) {
    for _ in 0..n {
        machine.advance(cpu_period());
    }
}

#[test]
fn test_draw_zero_glyph_end_to_end() {
    let machine = Machine::new(MachineConf::default());
    // LD V0, 0; LD V1, 0; LD I, 0x050; DRW V0, V1, 5
    machine
        .load_rom(&[0x60, 0x00, 0x61, 0x00, 0xA0, 0x50, 0xD0, 0x15])
        .unwrap();
    step_n(&machine, 4);

    let expected = "\
        ####....\n\
        #..#....\n\
        #..#....\n\
        #..#....\n\
        ####....\n";
    for (y, row) in expected.lines().enumerate() {
        for (x, px) in row.chars().enumerate() {
            assert_eq!(machine.pixel(x, y), px == '#', "pixel ({x}, {y})");
        }
    }
    assert!(machine.halt_reason().is_none());
}

#[test]
fn test_cls_clears_regardless_of_prior_state() {
    let machine = Machine::new(MachineConf::default());
    // Draw the glyph, then CLS.
    machine
        .load_rom(&[0xA0, 0x50, 0xD0, 0x15, 0x00, 0xE0])
        .unwrap();
    step_n(&machine, 3);

    let dump = machine.dump_display().unwrap();
    assert!(dump.chars().all(|c| c != '#'));
}

#[test]
fn test_unknown_opcode_halts_machine() {
    let machine = Machine::new(MachineConf::default());
    machine.load_rom(&[0xFF, 0xFF]).unwrap();

    step_n(&machine, 2);

    assert!(!machine.is_running());
    assert_eq!(machine.halt_reason(), Some(OktoError::UnknownOpcode(0xFFFF)));
}

#[test]
fn test_oversized_rom_rejected() {
    let machine = Machine::new(MachineConf::default());
    let rom = vec![0u8; 0x1000];
    assert!(matches!(
        machine.load_rom(&rom),
        Err(OktoError::RomTooLarge { .. })
    ));
}

#[test]
fn test_base64_rom_round_trip() {
    let machine = Machine::new(MachineConf::default());
    // CLS; LD I, 0x050; DRW V0, V1, 5  (00E0 A050 D015)
    machine.load_rom_base64("AOCgUNAV").unwrap();
    step_n(&machine, 3);

    assert!(machine.pixel(0, 0));
    assert!(machine.halt_reason().is_none());
}

#[test]
fn test_skip_driven_by_keypad() {
    let machine = Machine::new(MachineConf::default());
    // LD V0, 7; SKP V0 (spins on the JP until key 7 is down);
    // then LD I, 0x050; DRW V0, V1, 5 draws the glyph at x=7.
    machine
        .load_rom(&[
            0x60, 0x07, // 0x200: LD V0, 7
            0xE0, 0x9E, // 0x202: SKP V0
            0x12, 0x02, // 0x204: JP 0x202
            0xA0, 0x50, // 0x206: LD I, 0x050
            0xD0, 0x15, // 0x208: DRW V0, V1, 5
        ])
        .unwrap();

    // Without the key the program spins between SKP and JP.
    step_n(&machine, 6);
    assert!(!machine.pixel(7, 0));

    machine.press(KeyCode::Key7);
    step_n(&machine, 4);
    machine.release(KeyCode::Key7);

    assert!(machine.pixel(7, 0));
    assert!(machine.halt_reason().is_none());
}

#[test]
fn test_sound_timer_alert_edges() {
    use std::{cell::Cell, rc::Rc};

    #[derive(Default)]
    struct AlertSpy {
        started: Cell<u32>,
        stopped: Cell<u32>,
    }

    impl Alert for AlertSpy {
        fn start_alert(&self) {
            self.started.set(self.started.get() + 1);
        }

        fn stop_alert(&self) {
            self.stopped.set(self.stopped.get() + 1);
        }
    }

    let spy = Rc::new(AlertSpy::default());
    let machine = Machine::with_devices(
        MachineConf::default(),
        Devices {
            presenter: None,
            alert: Some(Rc::clone(&spy) as Rc<dyn Alert>),
        },
    );

    // LD V0, 2; LD ST, V0; spin.
    machine
        .load_rom(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04])
        .unwrap();
    step_n(&machine, 2);
    assert_eq!(spy.started.get(), 1);
    assert_eq!(spy.stopped.get(), 0);

    // Two 60 Hz periods run the countdown to zero.
    machine.advance(Hz(60).into());
    machine.advance(Hz(60).into());
    assert_eq!(spy.stopped.get(), 1);
}
