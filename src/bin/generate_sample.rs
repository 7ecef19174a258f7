use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const BRANDS: [&str; 5] = ["Apple", "Samsung", "Huawei", "Oppo", "Vivo"];
const CITIES: [&str; 4] = ["Kuala Lumpur", "Penang", "Johor Bahru", "Kota Kinabalu"];
const INCOME: [&str; 4] = ["<2000", "2000-4999", "5000-9999", ">=10000"];
const USAGE: [&str; 3] = ["Social", "Gaming", "Work"];
const COMMENTS: [&str; 6] = [
    "battery lasts all day",
    "camera is great, price is not",
    "I'd switch for a bigger screen",
    "",
    "needs 5G",
    "fast charging {65W}",
];

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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Respondent {
    age: i64,
    city: &'static str,
    income: &'static str,
    usage: &'static str,
    comment: &'static str,
    brand: &'static str,
}

/// Brand leans on income and usage so a tree has something to find.
fn respondent(rng: &mut SimpleRng) -> Respondent {
    let income_idx = (rng.next_u64() % INCOME.len() as u64) as usize;
    let usage = rng.pick(&USAGE);
    let brand = if rng.next_f64() < 0.7 {
        match (income_idx, usage) {
            (3, _) | (2, "Work") => "Apple",
            (2, _) | (1, "Gaming") => "Samsung",
            (1, _) => "Huawei",
            (_, "Social") => "Oppo",
            _ => "Vivo",
        }
    } else {
        rng.pick(&BRANDS)
    };
    Respondent {
        age: 18 + (rng.next_u64() % 5) as i64 * 10,
        city: rng.pick(&CITIES),
        income: INCOME[income_idx],
        usage,
        comment: rng.pick(&COMMENTS),
        brand,
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows: Vec<Respondent> = (0..200).map(|_| respondent(&mut rng)).collect();

    // Write CSV
    let csv_path = "sample_survey.csv";
    let mut csv_out =
        csv::Writer::from_path(csv_path).with_context(|| format!("creating {csv_path}"))?;
    csv_out.write_record(["Age", "City", "Income", "Usage", "Comment", "Current_brand"])?;
    for r in &rows {
        let age = r.age.to_string();
        csv_out.write_record([age.as_str(), r.city, r.income, r.usage, r.comment, r.brand])?;
    }
    csv_out.flush()?;

    // Build Arrow arrays; empty comments become nulls
    let schema = Arc::new(Schema::new(vec![
        Field::new("Age", DataType::Int64, false),
        Field::new("City", DataType::Utf8, false),
        Field::new("Income", DataType::Utf8, false),
        Field::new("Usage", DataType::Utf8, false),
        Field::new("Comment", DataType::Utf8, true),
        Field::new("Current_brand", DataType::Utf8, false),
    ]));
    let strings = |f: fn(&Respondent) -> &'static str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.age).collect::<Vec<_>>())),
        strings(|r| r.city),
        strings(|r| r.income),
        strings(|r| r.usage),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| (!r.comment.is_empty()).then_some(r.comment))
                .collect::<Vec<_>>(),
        )),
        strings(|r| r.brand),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    // Write Parquet
    let parquet_path = "sample_survey.parquet";
    let file =
        std::fs::File::create(parquet_path).with_context(|| format!("creating {parquet_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!("Wrote {} respondents to {csv_path} and {parquet_path}", rows.len());
    Ok(())
}
