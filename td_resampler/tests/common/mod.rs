#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// A scratch directory holding one source CSV.
pub struct Fixture {
    pub dir: TempDir, // keep alive for the life of the test
    pub input: PathBuf,
}

impl Fixture {
    pub fn new(csv: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("input.csv");
        std::fs::write(&input, csv).expect("write input");
        Self { dir, input }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).expect("read output")
    }
}

/// Four quarter-hour bars on 2018-12-20, 09:00 to 09:45.
pub fn one_morning() -> &'static str {
    "Date,Time,Open,High,Low,Close,Up,Down\n\
     12/20/2018,09:00,1.0,1.5,0.5,1.25,10,5\n\
     12/20/2018,09:15,2.0,2.5,1.5,2.25,11,6\n\
     12/20/2018,09:30,3.0,3.5,2.5,3.25,12,7\n\
     12/20/2018,09:45,4.0,4.5,3.5,4.25,13,8\n"
}

/// One close per day from Thursday 2019-01-03 to Saturday 2019-01-12.
pub fn ten_days() -> String {
    let mut csv = String::from("Date,Time,Close\n");
    for day in 3..=12 {
        csv.push_str(&format!("2019-01-{day:02},16:00,{day}\n"));
    }
    csv
}

/// Eight quarter-hour closes 0..=7 from 05:00Z to 06:45Z on 2024-11-03, the hour
/// New York repeats when it falls back.
pub fn fall_back_hour() -> String {
    let mut csv = String::from("Date,Time,Close\n");
    for k in 0..8 {
        let (h, m) = (5 + k / 4, 15 * (k % 4));
        csv.push_str(&format!("2024-11-03,{h:02}:{m:02},{k}\n"));
    }
    csv
}
