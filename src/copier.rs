use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, IoOp, Result};
use crate::records::{check_terminated, open_destination, open_source};

/// Outcome of a successful copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySummary {
    pub rows_copied: usize,
    /// True when the source ran out before the limit was reached.
    pub source_exhausted: bool,
}

/// Copies the first `limit` rows of the CSV file at `source` into
/// `destination`, creating or truncating it.
///
/// The source is opened first, so a missing source never leaves an empty
/// destination behind. Reading stops as soon as `limit` rows have been
/// written. A failure part way through may leave a partial destination.
pub fn copy_rows<P, Q>(source: P, destination: Q, limit: usize) -> Result<CopySummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (source, destination) = (source.as_ref(), destination.as_ref());

    let mut rdr = open_source(source)?;
    let mut wtr = open_destination(destination)?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        limit,
        "copying rows"
    );

    let mut record = csv::StringRecord::new();
    let mut rows_copied = 0;
    while rows_copied < limit {
        let has_record = rdr
            .read_record(&mut record)
            .map_err(|e| Error::from_csv(IoOp::ReadSource, source, e))?;
        if !has_record {
            break;
        }
        wtr.write_record(&record)
            .map_err(|e| Error::from_csv(IoOp::WriteDestination, destination, e))?;
        rows_copied += 1;
    }

    check_terminated(&rdr, source)?;
    wtr.flush()
        .map_err(|e| Error::io(IoOp::WriteDestination, destination, e))?;

    let summary = CopySummary {
        rows_copied,
        source_exhausted: rdr.is_done(),
    };
    info!(
        rows = summary.rows_copied,
        exhausted = summary.source_exhausted,
        "copy finished"
    );
    Ok(summary)
}
