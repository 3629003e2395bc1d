use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let transporters = ["Shree Logistics", "Roadline Carriers", "Om Transport", "Ganesh Freight"];
    let loading_locations = ["Pune", "Nashik", "Aurangabad"];
    let invoice_locations = ["Mumbai", "Pune", "Nagpur", "Surat"];
    let payment_modes = ["TO PAY", "PAID", "TBB"];
    let vehicles: Vec<String> = (1..=12).map(|i| format!("MH12AB{:04}", 1000 + i * 37)).collect();
    let vehicle_refs: Vec<&str> = vehicles.iter().map(String::as_str).collect();

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
    let first_day = NaiveDate::from_ymd_opt(2025, 3, 1).context("first day")?;
    let first_day_num = (first_day - epoch).num_days() as i32;

    let n_rows = 240;
    let mut sr_no: Vec<i64> = Vec::with_capacity(n_rows);
    let mut dates: Vec<i32> = Vec::with_capacity(n_rows);
    let mut transporter: Vec<&str> = Vec::with_capacity(n_rows);
    let mut vehicle: Vec<&str> = Vec::with_capacity(n_rows);
    let mut loading: Vec<&str> = Vec::with_capacity(n_rows);
    let mut invoice_loc: Vec<&str> = Vec::with_capacity(n_rows);
    let mut payment: Vec<&str> = Vec::with_capacity(n_rows);
    let mut qty_kg: Vec<f64> = Vec::with_capacity(n_rows);
    let mut value: Vec<f64> = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let kg = rng.range(8_000.0, 28_000.0).round();
        sr_no.push(i as i64 + 1);
        dates.push(first_day_num + (rng.next_u64() % 31) as i32);
        transporter.push(rng.pick(&transporters));
        vehicle.push(rng.pick(&vehicle_refs));
        loading.push(rng.pick(&loading_locations));
        invoice_loc.push(rng.pick(&invoice_locations));
        payment.push(rng.pick(&payment_modes));
        qty_kg.push(kg);
        // Roughly ₹4–6 per kg.
        value.push((kg * rng.range(4.0, 6.0) * 100.0).round() / 100.0);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("SR NO", DataType::Int64, false),
        Field::new("INV DATE", DataType::Date32, false),
        Field::new("TRANSPORTER", DataType::Utf8, false),
        Field::new("VEHICLE NUMBER", DataType::Utf8, false),
        Field::new("LOADING LOCATION", DataType::Utf8, false),
        Field::new("INV LOCATION", DataType::Utf8, false),
        Field::new("PAYMENT BY", DataType::Utf8, false),
        Field::new("INV -QNT-KG", DataType::Float64, false),
        Field::new("INV -VALUE", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(sr_no)),
        Arc::new(Date32Array::from(dates)),
        Arc::new(StringArray::from(transporter)),
        Arc::new(StringArray::from(vehicle)),
        Arc::new(StringArray::from(loading)),
        Arc::new(StringArray::from(invoice_loc)),
        Arc::new(StringArray::from(payment)),
        Arc::new(Float64Array::from(qty_kg)),
        Arc::new(Float64Array::from(value)),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    // Write Parquet
    let output_path = "sample_shipments.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!("Wrote {n_rows} shipments to {output_path}");
    Ok(())
}
