//! Dispatch of the parsed command line onto the engine.

use std::{fs::File, io::BufWriter};

use engine::{
    Amount, AnalysisFilter, AnalysisReport, CostSheet, EngineError, HistoryTable, LineValue,
    ProjectFilter, Session, export_report,
};

use crate::{
    config::{
        AnalysisCommand, AppConfig, Command, CostCommand, FilterArgs, LinesArgs, ProjectCommand,
        ReferenceCommand,
    },
    error::{AppError, Result},
};

pub fn run(config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Cost(CostCommand::Total(args)) => {
            let session = if args.defaults {
                Some(open_session(config)?)
            } else {
                None
            };
            let sheet = build_sheet(&args, session.as_ref())?;
            print_sheet(&sheet);
        }
        Command::Cost(CostCommand::Save { project, lines }) => {
            let session = open_session(config)?;
            let sheet = build_sheet(&lines, Some(&session))?;
            let record = session.save_sheet(&sheet, &project)?;
            let description = session.workspace()?.projects().describe(&project)?;
            if !description.is_empty() {
                println!("{}: {description}", record.project());
            }
            println!("saved, total {}", Amount(record.total()).grouped());
        }
        Command::Cost(CostCommand::Last) => {
            let session = open_session(config)?;
            let sheet = session.last_sheet()?;
            if sheet.is_empty() {
                println!("no saved calculation");
            } else {
                print_sheet(&sheet);
            }
        }
        Command::History => {
            let session = open_session(config)?;
            print_history(&session.history_or_empty()?);
        }
        Command::Reference(command) => run_reference(config, command)?,
        Command::Project(command) => run_project(config, command)?,
        Command::Analysis(command) => run_analysis(config, command)?,
    }
    Ok(())
}

fn open_session(config: &AppConfig) -> Result<Session> {
    let path = config
        .workspace
        .as_deref()
        .ok_or(AppError::Engine(EngineError::NoWorkspace))?;
    Ok(Session::open(path)?)
}

/// Splits `LABEL=VALUE` at the first `=`; a bare label has an empty value.
pub(crate) fn parse_line(arg: &str) -> (&str, &str) {
    match arg.split_once('=') {
        Some((label, value)) => (label.trim(), value.trim()),
        None => (arg.trim(), ""),
    }
}

fn build_sheet(args: &LinesArgs, session: Option<&Session>) -> Result<CostSheet> {
    if args.lines.is_empty() {
        return Err(AppError::Input("no cost lines given".to_string()));
    }
    let mut sheet = CostSheet::new();
    for arg in &args.lines {
        let (label, value) = parse_line(arg);
        sheet.add_line(label, value);
    }
    if let Some(session) = session.filter(|_| args.defaults) {
        let filled = sheet.apply_defaults(session.references());
        tracing::debug!("{filled} values filled from references");
    }
    Ok(sheet)
}

fn print_sheet(sheet: &CostSheet) {
    let base = sheet.base_total();
    let width = sheet
        .lines()
        .iter()
        .map(|l| l.label.chars().count())
        .max()
        .unwrap_or(0);
    for line in sheet.lines() {
        let value = line.value();
        let note = match value {
            LineValue::Percent(_) => format!("  ({})", line.raw_value.trim()),
            LineValue::MalformedPercent | LineValue::Invalid => "  (ignored)".to_string(),
            LineValue::Absolute(_) => String::new(),
        };
        println!(
            "{:<width$}  {:>12}{note}",
            line.label,
            Amount(value.resolve(base)).grouped()
        );
    }
    println!("Итого: {}", Amount(sheet.total()).grouped());
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    println!("{}", render_row(headers.iter().copied(), &widths));
    for row in rows {
        println!("{}", render_row(row.iter().map(String::as_str), &widths));
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn print_history(table: &HistoryTable) {
    if table.is_empty() {
        println!("history is empty");
        return;
    }
    let headers: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = table
        .records
        .iter()
        .map(|record| table.row(record).into_iter().map(str::to_string).collect())
        .collect();
    print_table(&headers, &rows);
}

fn run_reference(config: &AppConfig, command: ReferenceCommand) -> Result<()> {
    let mut session = open_session(config)?;
    match command {
        ReferenceCommand::List => {
            let rows: Vec<Vec<String>> = session
                .reference_sheet()
                .entries()
                .iter()
                .map(|e| vec![e.name.clone(), e.value.clone()])
                .collect();
            print_table(&["Название", "Значение"], &rows);
        }
        ReferenceCommand::Set { name, value } => {
            if name.trim().is_empty() || value.trim().is_empty() {
                return Err(AppError::Input(
                    "reference name and value must not be empty".to_string(),
                ));
            }
            session.reference_sheet_mut().upsert(&name, &value);
            let references = session.save_references()?;
            println!("saved, {} references", references.len());
        }
        ReferenceCommand::Remove { name } => {
            session.reference_sheet_mut().remove(&name)?;
            let references = session.save_references()?;
            println!("removed, {} references", references.len());
        }
    }
    Ok(())
}

fn run_project(config: &AppConfig, command: ProjectCommand) -> Result<()> {
    let session = open_session(config)?;
    let projects = session.workspace()?.projects();
    match command {
        ProjectCommand::List => {
            let rows: Vec<Vec<String>> = projects
                .load()?
                .into_iter()
                .map(|p| vec![p.name, p.description, p.status.to_string()])
                .collect();
            print_table(&["Название", "Описание", "Статус"], &rows);
        }
        ProjectCommand::Add { name, description } => {
            let project = projects.add(&name, &description)?;
            println!("added \"{}\" ({})", project.name, project.status);
        }
        ProjectCommand::Edit {
            name,
            new_name,
            description,
        } => {
            let current = projects.get(&name)?;
            let project = projects.edit(
                &name,
                new_name.as_deref().unwrap_or(&current.name),
                description.as_deref().unwrap_or(&current.description),
            )?;
            println!("updated \"{}\"", project.name);
        }
        ProjectCommand::Delete { name } => {
            projects.delete(&name)?;
            println!("deleted \"{}\"", name.trim());
        }
        ProjectCommand::Toggle { name } => {
            let status = projects.toggle_status(&name)?;
            println!("\"{}\" is now {status}", name.trim());
        }
    }
    Ok(())
}

impl From<FilterArgs> for AnalysisFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            project: ProjectFilter::from_name(args.project.as_deref()),
            from: args.from,
            to: args.to,
        }
    }
}

fn run_analysis(config: &AppConfig, command: AnalysisCommand) -> Result<()> {
    let session = open_session(config)?;
    let data = session.analysis()?;
    match command {
        AnalysisCommand::Report { filter, json } => {
            let report = data.report(&filter.into());
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        AnalysisCommand::Export { filter, output } => {
            let report = data.report(&filter.into());
            let file = File::create(&output)?;
            export_report(&report, BufWriter::new(file))?;
            println!("report written to {output}");
        }
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    if report.is_empty() {
        println!("no calculations match the filter");
        return;
    }
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.project.clone(),
                Amount(e.total).to_string(),
            ]
        })
        .collect();
    print_table(&["Дата", "Проект", "Итоговая себестоимость"], &rows);

    println!();
    println!("Сводка по проектам:");
    for stats in &report.stats {
        println!(
            "  {}: n = {}, среднее = {}, медиана = {}, мин = {}, макс = {}",
            stats.project,
            stats.count,
            Amount(stats.mean),
            Amount(stats.median),
            Amount(stats.min),
            Amount(stats.max)
        );
    }
    for share in &report.shares {
        println!("  {}: {:.1}%", share.project, share.share * 100.0);
    }
    if let Some(average) = report.average {
        println!("Среднее: {}", Amount(average));
    }
}
