use nice_bison_core::config::SimConfig;
use nice_bison_core::model::Model;
use std::time::Duration;

fn main() {
    let steps = 200u32;
    for (side, initial_bison, grass_per_tick) in [(20, 100, 200), (50, 1_000, 2_000), (100, 5_000, 10_000)] {
        let config = SimConfig {
            width: side,
            height: side,
            initial_bison,
            grass_per_tick,
            grass_spread: side as f64 / 4.0,
            seed: 42,
            ..SimConfig::default()
        };
        println!(
            "Benchmarking {side}x{side} grid, {initial_bison} bison, {grass_per_tick} grass/tick"
        );

        let mut model = Model::new(config);
        let mut activation = Duration::ZERO;
        let mut regrowth = Duration::ZERO;
        let mut total = Duration::ZERO;
        for _ in 0..steps {
            let timings = model.step();
            activation += Duration::from_micros(timings.activation_us);
            regrowth += Duration::from_micros(timings.regrowth_us);
            total += Duration::from_micros(timings.total_us);
        }

        println!("  final population: {}", model.bison_count());
        println!("  avg activation per step: {:?}", activation / steps);
        println!("  avg regrowth per step:   {:?}", regrowth / steps);
        println!("  avg total per step:      {:?}", total / steps);
        let snapshot_overhead = total.saturating_sub(activation + regrowth);
        println!("  avg metrics overhead:    {:?}", snapshot_overhead / steps);
    }
}
