use anyhow::{Context, Result};
use log::info;

use crate::{cli::NormalizeArgs, io_utils};

pub fn execute(args: &NormalizeArgs) -> Result<()> {
    let filters = crate::build_filters(&args.filters)?;
    let session = crate::open_session(&args.source, &args.normalize)?;
    let records = filters.apply(session.table.records());
    let delimiter = args.output_delimiter.unwrap_or_else(|| {
        io_utils::resolve_input_delimiter(&args.source.input, args.source.delimiter)
    });
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
    session
        .table
        .write_csv(&records, &mut writer)
        .context("Writing canonical table")?;
    match &args.output {
        Some(path) if !io_utils::is_dash(path) => info!(
            "Wrote {} of {} canonical row(s) with {} passthrough column(s) to {:?}",
            records.len(),
            session.table.len(),
            session.table.passthrough_headers().len(),
            path
        ),
        _ => info!(
            "Wrote {} of {} canonical row(s) to stdout",
            records.len(),
            session.table.len()
        ),
    }
    Ok(())
}
