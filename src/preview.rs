use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let filters = crate::build_filters(&args.filters)?;
    let session = crate::open_session(&args.source, &args.normalize)?;
    let records = filters.apply(session.table.records());
    let rows = records
        .iter()
        .take(args.rows)
        .map(|record| record.to_cells())
        .collect::<Vec<_>>();

    table::print_table(&session.table.headers(), &rows);
    info!(
        "Displayed {} of {} matching row(s) from {:?}",
        rows.len(),
        records.len(),
        args.source.input
    );
    Ok(())
}
