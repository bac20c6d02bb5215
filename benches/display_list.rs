#![allow(clippy::unwrap_used)]
//! Benchmarks for applying driver notifications to the window shell

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parsec_vdisplay::Result;
use parsec_vdisplay::config::AppConfig;
use parsec_vdisplay::shell::{Shell, ShellHost};
use parsec_vdisplay::vdd::{Display, DisplayChange, MAX_DISPLAYS, SimulatedDriver};
use std::hint::black_box;
use std::sync::Arc;

/// Host with no side effects
struct NullHost;

impl ShellHost for NullHost {
    fn init_tray(&mut self) -> Result<()> {
        Ok(())
    }
    fn uninit_tray(&mut self) {}
    fn show_app(&mut self) {}
    fn hide_window(&mut self) {}
    fn show_warning(&mut self, _title: &str, _message: &str) {}
    fn show_info(&mut self, _title: &str, _message: &str) {}
    fn ask_yes_no(&mut self, _title: &str, _message: &str) -> bool {
        true
    }
    fn open_url(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }
    fn quit(&mut self) {}
}

fn change_with(count: usize) -> DisplayChange {
    let displays = (0..count)
        .map(|i| Display {
            index: u32::try_from(i).unwrap(),
            device_name: format!(r"\\.\DISPLAY{}", i + 10),
            width: 2560,
            height: 1440,
            refresh_rate: 144,
        })
        .collect();
    DisplayChange {
        displays,
        no_monitors: false,
    }
}

fn bench_on_display_changed(c: &mut Criterion) {
    let config = AppConfig {
        check_update_on_startup: false,
        ..AppConfig::default()
    };
    let mut shell = Shell::new(Arc::new(SimulatedDriver::new()), NullHost, config).unwrap();
    shell.activate();

    let mut group = c.benchmark_group("on_display_changed");
    for count in [0, 1, MAX_DISPLAYS] {
        let change = change_with(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &change, |b, change| {
            b.iter(|| shell.on_display_changed(black_box(change.clone())));
        });
    }
    group.finish();
}

fn bench_display_labels(c: &mut Criterion) {
    let change = change_with(MAX_DISPLAYS);

    c.bench_function("display_labels", |b| {
        b.iter(|| {
            let labels: Vec<String> = black_box(&change.displays)
                .iter()
                .map(Display::label)
                .collect();
            black_box(labels);
        });
    });
}

fn bench_add_remove_cycle(c: &mut Criterion) {
    let config = AppConfig {
        check_update_on_startup: false,
        ..AppConfig::default()
    };
    let mut shell = Shell::new(Arc::new(SimulatedDriver::new()), NullHost, config).unwrap();
    shell.activate();
    shell.pump_notifications();

    c.bench_function("add_remove_cycle", |b| {
        b.iter(|| {
            shell.add_display();
            shell.pump_notifications();
            shell.remove_last_display();
            black_box(shell.pump_notifications());
        });
    });
}

criterion_group!(
    benches,
    bench_on_display_changed,
    bench_display_labels,
    bench_add_remove_cycle
);
criterion_main!(benches);
