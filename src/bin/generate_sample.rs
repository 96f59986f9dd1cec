use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

use weight_tracker::data::external::mat::{self, MatVariable};
use weight_tracker::data::external::{npy, pickle};
use weight_tracker::data::model::NdArray;

const DAY_COUNT: u64 = 14;
const DAILY_FILE: &str = "daily_value.npy";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// An experiment log in the shape the weight extractor expects.
fn details_text(date: &str, weight: f64, rng: &mut SimpleRng) -> String {
    format!(
        "Experiment: IP75\nDate: {date}\nSession: {}\nBW: {weight:.1}% (baseline 25.0g)\nNotes: none\n",
        1 + rng.next_u64() % 3
    )
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "sample_days".into()));
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2025, 1, 6).context("invalid start date")?;

    let mut values = Vec::new();
    for i in 0..DAY_COUNT {
        let date = start
            .checked_add_days(Days::new(i))
            .context("date out of range")?
            .format("%Y%m%d")
            .to_string();

        // Weight drifts down over the experiment; the external value follows it.
        let weight = 100.0 - 0.8 * i as f64 + rng.gauss(0.0, 0.6);
        let mut value = 0.5 * weight + rng.gauss(0.0, 0.4);
        if i == DAY_COUNT / 2 {
            value += 15.0;
        }
        values.push(value);

        let day_dir = out_dir.join(&date);
        fs::create_dir_all(&day_dir).with_context(|| format!("creating {}", day_dir.display()))?;
        write(
            &day_dir.join(format!("IP75_{date}_ExpDetails.txt")),
            details_text(&date, weight, &mut rng).as_bytes(),
        )?;
        write(&day_dir.join(DAILY_FILE), &npy::encode_f64(&[], &[value]))?;
    }

    // Non-day entries are ignored by discovery.
    fs::create_dir_all(out_dir.join("analysis"))?;

    let n = values.len();
    write(&out_dir.join("all_values.npy"), &npy::encode_f64(&[n], &values))?;
    write(&out_dir.join("all_values.pkl"), &pickle::encode(&values)?)?;
    write(
        &out_dir.join("all_values.mat"),
        &mat::encode(&[("values", MatVariable::Double(NdArray::new(vec![n], values)?))]),
    )?;

    println!(
        "Wrote {DAY_COUNT} day folders with {DAILY_FILE} and all_values.{{npy,pkl,mat}} to {}",
        out_dir.display()
    );
    Ok(())
}
