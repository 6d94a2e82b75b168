// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(raw)
		.map(|d| d.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid timestamp {raw:?}: {e}")))
}

pub(crate) fn parse_opt_ts(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, DbError> {
	raw.map(parse_ts).transpose()
}
