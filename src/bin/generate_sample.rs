use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde_json::json;

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

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Index into `weights`, proportional to the weight values.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut roll = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if roll < *w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }
}

struct OffenseKind {
    group: &'static str,
    description: &'static str,
    class: &'static str,
    ucr: &'static str,
    weight: f64,
}

const OFFENSES: [OffenseKind; 10] = [
    OffenseKind { group: "Larceny", description: "LARCENY ALL OTHERS", class: "Property", ucr: "Part One", weight: 9.0 },
    OffenseKind { group: "Motor Vehicle Accident Response", description: "M/V - LEAVING SCENE - PROPERTY DAMAGE", class: "Other", ucr: "Part Three", weight: 8.0 },
    OffenseKind { group: "Medical Assistance", description: "SICK/INJURED/MEDICAL - PERSON", class: "Other", ucr: "Part Three", weight: 7.0 },
    OffenseKind { group: "Investigate Person", description: "INVESTIGATE PERSON", class: "Other", ucr: "Part Three", weight: 6.0 },
    OffenseKind { group: "Vandalism", description: "VANDALISM", class: "Property", ucr: "Part Two", weight: 5.0 },
    OffenseKind { group: "Simple Assault", description: "ASSAULT SIMPLE - BATTERY", class: "Violent", ucr: "Part Two", weight: 5.0 },
    OffenseKind { group: "Verbal Disputes", description: "VERBAL DISPUTE", class: "Society", ucr: "Part Two", weight: 4.0 },
    OffenseKind { group: "Drug Violation", description: "DRUGS - POSSESSION", class: "Society", ucr: "Part Two", weight: 3.0 },
    OffenseKind { group: "Robbery", description: "ROBBERY - STREET", class: "Violent", ucr: "Part One", weight: 2.0 },
    OffenseKind { group: "Aggravated Assault", description: "ASSAULT - AGGRAVATED - BATTERY", class: "Violent", ucr: "Part One", weight: 2.0 },
];

struct Area {
    name: &'static str,
    region_id: i64,
    center: [f64; 2], // lon, lat
    weight: f64,
}

const AREAS: [Area; 6] = [
    Area { name: "Back Bay", region_id: 25025010100, center: [-71.081, 42.350], weight: 5.0 },
    Area { name: "Roxbury", region_id: 25025010200, center: [-71.089, 42.324], weight: 6.0 },
    Area { name: "Dorchester", region_id: 25025010300, center: [-71.060, 42.300], weight: 7.0 },
    Area { name: "Fenway", region_id: 25025010400, center: [-71.100, 42.343], weight: 4.0 },
    Area { name: "South End", region_id: 25025010500, center: [-71.072, 42.339], weight: 4.0 },
    Area { name: "Charlestown", region_id: 25025010600, center: [-71.062, 42.378], weight: 2.0 },
];

const AREA_HALF_WIDTH: f64 = 0.011;

const STREETS: [&str; 8] = [
    "WASHINGTON ST",
    "BOYLSTON ST",
    "BLUE HILL AVE",
    "TREMONT ST",
    "MASSACHUSETTS AVE",
    "CENTRE ST",
    "DORCHESTER AVE",
    "COMMONWEALTH AVE",
];

#[derive(Default)]
struct Columns {
    date: Vec<String>,
    hour: Vec<i64>,
    ucr: Vec<Option<String>>,
    group: Vec<String>,
    description: Vec<String>,
    class: Vec<String>,
    shooting: Vec<Option<String>>,
    name: Vec<Option<String>>,
    region: Vec<i64>,
    street: Vec<String>,
    x: Vec<Option<f64>>,
    y: Vec<Option<f64>>,
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let mut cols = Columns::default();

    let offense_weights: Vec<f64> = OFFENSES.iter().map(|o| o.weight).collect();
    let area_weights: Vec<f64> = AREAS.iter().map(|a| a.weight).collect();
    // Evening hours are busier than the small hours.
    let hour_weights: Vec<f64> = (0..24)
        .map(|h| match h {
            0..=5 => 1.0,
            6..=11 => 2.5,
            12..=17 => 4.0,
            _ => 5.0,
        })
        .collect();

    let start = NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2018, 12, 31).expect("valid date");

    let mut day = start;
    loop {
        // Weekends run a little hotter.
        let weekend_boost = match day.weekday() {
            chrono::Weekday::Fri | chrono::Weekday::Sat => 4.0,
            chrono::Weekday::Sun => 2.0,
            _ => 0.0,
        };
        let n_reports = (9.0 + weekend_boost + rng.range(0.0, 6.0)) as usize;

        for _ in 0..n_reports {
            let offense = &OFFENSES[rng.weighted(&offense_weights)];
            let area = &AREAS[rng.weighted(&area_weights)];
            let hour = rng.weighted(&hour_weights) as i64;

            cols.date.push(day.to_string());
            cols.hour.push(hour);
            // A few rows carry no UCR class at all.
            cols.ucr.push((!rng.chance(0.02)).then(|| offense.ucr.to_string()));
            cols.group.push(offense.group.to_string());
            cols.description.push(offense.description.to_string());
            cols.class.push(offense.class.to_string());
            cols.shooting.push(if offense.class == "Violent" && rng.chance(0.06) {
                Some("Y".to_string())
            } else if rng.chance(0.7) {
                Some("N".to_string())
            } else {
                None
            });

            // Some rows never got mapped to a region.
            if rng.chance(0.03) {
                cols.name.push(None);
                cols.region.push(0);
            } else {
                cols.name.push(Some(area.name.to_string()));
                cols.region.push(area.region_id);
            }

            cols.street.push(STREETS[rng.weighted(&[1.0; 8])].to_string());

            if rng.chance(0.02) {
                cols.x.push(None);
                cols.y.push(None);
            } else {
                cols.x.push(Some(
                    area.center[0] + rng.range(-AREA_HALF_WIDTH, AREA_HALF_WIDTH),
                ));
                cols.y.push(Some(
                    area.center[1] + rng.range(-AREA_HALF_WIDTH, AREA_HALF_WIDTH),
                ));
            }
        }

        if day >= end {
            break;
        }
        day = day.succ_opt().expect("next calendar day");
    }

    std::fs::create_dir_all("data").expect("creating data directory");
    write_csv(&cols);
    write_parquet(&cols);
    write_geojson();

    println!(
        "Wrote {} incidents to data/incidents.csv and data/incidents.parquet, {} neighborhoods to data/neighborhoods.geojson",
        cols.date.len(),
        AREAS.len()
    );
}

fn write_csv(cols: &Columns) {
    let mut writer = csv::Writer::from_path("data/incidents.csv").expect("creating CSV");
    writer
        .write_record([
            "DATE",
            "TIME_HOUR",
            "UCR",
            "OFFENSE_CODE_GROUP",
            "OFFENSE_DESCRIPTION",
            "CRIME_CLASS",
            "SHOOTING",
            "Name",
            "GEOID10",
            "STREET",
            "X",
            "Y",
        ])
        .expect("writing CSV header");

    for i in 0..cols.date.len() {
        writer
            .write_record([
                cols.date[i].clone(),
                cols.hour[i].to_string(),
                cols.ucr[i].clone().unwrap_or_default(),
                cols.group[i].clone(),
                cols.description[i].clone(),
                cols.class[i].clone(),
                cols.shooting[i].clone().unwrap_or_default(),
                cols.name[i].clone().unwrap_or_default(),
                if cols.region[i] == 0 {
                    String::new()
                } else {
                    cols.region[i].to_string()
                },
                cols.street[i].clone(),
                cols.x[i].map(|v| format!("{v:.6}")).unwrap_or_default(),
                cols.y[i].map(|v| format!("{v:.6}")).unwrap_or_default(),
            ])
            .expect("writing CSV row");
    }
    writer.flush().expect("flushing CSV");
}

fn write_parquet(cols: &Columns) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("DATE", DataType::Utf8, false),
        Field::new("TIME_HOUR", DataType::Int64, false),
        Field::new("UCR", DataType::Utf8, true),
        Field::new("OFFENSE_CODE_GROUP", DataType::Utf8, false),
        Field::new("OFFENSE_DESCRIPTION", DataType::Utf8, false),
        Field::new("CRIME_CLASS", DataType::Utf8, false),
        Field::new("SHOOTING", DataType::Utf8, true),
        Field::new("Name", DataType::Utf8, true),
        Field::new("GEOID10", DataType::Int64, false),
        Field::new("STREET", DataType::Utf8, false),
        Field::new("X", DataType::Float64, true),
        Field::new("Y", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(cols.date.clone())),
            Arc::new(Int64Array::from(cols.hour.clone())),
            Arc::new(StringArray::from(cols.ucr.clone())),
            Arc::new(StringArray::from(cols.group.clone())),
            Arc::new(StringArray::from(cols.description.clone())),
            Arc::new(StringArray::from(cols.class.clone())),
            Arc::new(StringArray::from(cols.shooting.clone())),
            Arc::new(StringArray::from(cols.name.clone())),
            Arc::new(Int64Array::from(cols.region.clone())),
            Arc::new(StringArray::from(cols.street.clone())),
            Arc::new(Float64Array::from(cols.x.clone())),
            Arc::new(Float64Array::from(cols.y.clone())),
        ],
    )
    .expect("building record batch");

    let file = std::fs::File::create("data/incidents.parquet").expect("creating parquet file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("creating parquet writer");
    writer.write(&batch).expect("writing parquet batch");
    writer.close().expect("closing parquet writer");
}

fn write_geojson() {
    let features: Vec<serde_json::Value> = AREAS
        .iter()
        .map(|area| {
            let [lon, lat] = area.center;
            let w = AREA_HALF_WIDTH;
            let ring = vec![
                vec![lon - w, lat - w],
                vec![lon + w, lat - w],
                vec![lon + w, lat + w],
                vec![lon - w, lat + w],
                vec![lon - w, lat - w],
            ];
            json!({
                "type": "Feature",
                "properties": { "Name": area.name, "GEOID10": area.region_id },
                "geometry": { "type": "Polygon", "coordinates": [ring] },
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    let text = serde_json::to_string_pretty(&collection).expect("serializing GeoJSON");
    std::fs::write("data/neighborhoods.geojson", text).expect("writing GeoJSON");
}
