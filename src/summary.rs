use anyhow::{Context, Result};
use log::info;

use crate::{
    aggregate::{self, Overview},
    cli::{OverviewArgs, SummaryArgs},
    io_utils, table,
};

pub fn execute_overview(args: &OverviewArgs) -> Result<()> {
    let filters = crate::build_filters(&args.filters)?;
    let session = crate::open_session(&args.source, &args.normalize)?;
    let records = filters.apply(session.table.records());
    let overview = Overview::compute(&records);

    let headers = vec!["Metric".to_string(), "Value".to_string()];
    table::print_table(&headers, &overview.render_rows());

    for dimension in &args.counts {
        let rows = aggregate::value_counts(&records, *dimension)
            .iter()
            .map(|count| count.to_cells(*dimension))
            .collect::<Vec<_>>();
        let headers = ["Dimension", "Value", "Count", "Percent"]
            .map(String::from)
            .to_vec();
        println!();
        table::print_table(&headers, &rows);
    }
    info!(
        "Overview covers {} of {} row(s)",
        records.len(),
        session.table.len()
    );
    Ok(())
}

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let filters = crate::build_filters(&args.filters)?;
    let session = crate::open_session(&args.source, &args.normalize)?;
    let records = filters.apply(session.table.records());
    let groups = aggregate::summarize(&records, &args.by, args.top);
    let headers = aggregate::summary_headers(&args.by);
    let rows = groups.iter().map(|g| g.to_cells()).collect::<Vec<_>>();

    match &args.output {
        Some(path) => {
            let mut writer = io_utils::open_csv_writer(Some(path.as_path()), b',')?;
            writer
                .write_record(&headers)
                .context("Writing summary header row")?;
            for row in &rows {
                writer.write_record(row).context("Writing summary row")?;
            }
            writer.flush().context("Flushing summary output")?;
            info!("Wrote {} group(s) to {:?}", rows.len(), path);
        }
        None => {
            table::print_table(&headers, &rows);
            info!(
                "Summarized {} row(s) into {} group(s)",
                records.len(),
                rows.len()
            );
        }
    }
    Ok(())
}
