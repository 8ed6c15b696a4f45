// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;

use chrono::Days;
use chrono::Local;
use chrono::NaiveDate;
use chrono::TimeZone;
use chrono::Timelike;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;

use crate::types::timestamp::Timestamp;

/// The default hour of day at which the study day rolls over.
pub const DEFAULT_ROLLOVER_HOUR: u32 = 4;

/// The calendar day used for daily-quota accounting. Timestamps before the
/// rollover hour belong to the previous day, so reviews at 2 AM count
/// towards yesterday's session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct StudyDate(NaiveDate);

impl StudyDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_timestamp(ts: Timestamp, rollover_hour: u32) -> Self {
        let local = ts.datetime().with_timezone(&Local);
        let mut date = local.date_naive();
        if local.hour() < rollover_hour {
            date = date.checked_sub_days(Days::new(1)).unwrap_or(date);
        }
        Self(date)
    }

    /// The timestamp at which the study day containing `now` ends.
    pub fn next_rollover(now: Timestamp, rollover_hour: u32) -> Timestamp {
        let study_date = Self::from_timestamp(now, rollover_hour);
        let next_day = study_date
            .0
            .checked_add_days(Days::new(1))
            .unwrap_or(study_date.0);
        let naive = next_day
            .and_hms_opt(rollover_hour.min(23), 0, 0)
            .unwrap_or_default();
        match Local.from_local_datetime(&naive).earliest() {
            Some(dt) => Timestamp::from_unix(dt.timestamp()),
            None => now,
        }
    }

    pub fn same_study_day(a: Timestamp, b: Timestamp, rollover_hour: u32) -> bool {
        Self::from_timestamp(a, rollover_hour) == Self::from_timestamp(b, rollover_hour)
    }
}

impl Display for StudyDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl ToSql for StudyDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for StudyDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        let date = NaiveDate::parse_from_str(&string, "%Y-%m-%d")
            .map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(StudyDate(date))
    }
}
