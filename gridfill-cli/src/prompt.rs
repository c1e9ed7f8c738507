//! Terminal version of the time-entry form.
//!
//! Walks the operator through every row of a [`CollectorForm`]; pressing
//! Enter keeps the value shown in brackets.

use std::io::{BufRead, Write};

use anyhow::Result;
use chrono::NaiveDate;
use gridfill::collector::HourInput;
use gridfill::datetime::{format_mmddyyyy, parse_iso_date, parse_mmddyyyy};
use gridfill::{AmPm, CollectorForm, DateTimeField, RowRecord};

pub struct Prompt<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Reads one answer. `None` for an empty line or end of input.
    fn ask(&mut self, label: &str, current: &str) -> Result<Option<String>> {
        write!(self.out, "  {label} [{current}]: ")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.out)?;
            return Ok(None);
        }
        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn ask_date(&mut self, label: &str, current: NaiveDate) -> Result<Option<NaiveDate>> {
        loop {
            let Some(answer) = self.ask(label, &format_mmddyyyy(current))? else {
                return Ok(None);
            };
            match parse_mmddyyyy(&answer).or_else(|_| parse_iso_date(&answer)) {
                Ok(date) => return Ok(Some(date)),
                Err(_) => writeln!(self.out, "  ⚠️  Use MM/DD/YYYY or YYYY-MM-DD")?,
            }
        }
    }

    /// Runs the whole form. Returns `None` when the operator declines to save.
    pub fn collect(&mut self, today: NaiveDate) -> Result<Option<Vec<RowRecord>>> {
        let mut form = CollectorForm::new(today);
        writeln!(self.out, "📝 Time entries (Enter keeps the value in brackets)")?;

        for row in 0..form.rows().len() {
            writeln!(self.out, "\nRow {}", row + 1)?;

            let current = form.rows()[row].start_date;
            if let Some(date) = self.ask_date("Start date", current)? {
                form.set_start_date(row, date)?;
            }
            self.time_fields(&mut form, row, DateTimeField::Start)?;

            let current = form.rows()[row].end_date;
            if let Some(date) = self.ask_date("End date", current)? {
                form.set_end_date(row, date)?;
            }
            self.time_fields(&mut form, row, DateTimeField::End)?;
        }

        let records = match form.save() {
            Ok(records) => records,
            Err(e) => {
                writeln!(self.out, "\n❌ {e}")?;
                return Ok(None);
            }
        };

        writeln!(self.out, "\n{}", serde_json::to_string_pretty(&records)?)?;
        let confirm = self.ask("Save and fill the grid? (y/n)", "y")?;
        let save = confirm
            .map(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
            .unwrap_or(true);
        Ok(save.then_some(records))
    }

    fn time_fields(
        &mut self,
        form: &mut CollectorForm,
        row: usize,
        side: DateTimeField,
    ) -> Result<()> {
        let name = match side {
            DateTimeField::Start => "Start",
            DateTimeField::End => "End",
        };
        let time = |form: &CollectorForm| match side {
            DateTimeField::Start => form.rows()[row].start.clone(),
            DateTimeField::End => form.rows()[row].end.clone(),
        };

        // A rejected answer empties the box; the shown value is put back so
        // Enter keeps working on the next ask.
        loop {
            let current = time(&*form).hours;
            let Some(answer) = self.ask(&format!("{name} hours"), &current)? else {
                break;
            };
            match form.input_hours(row, side, &answer)? {
                HourInput::Cleared => {
                    form.input_hours(row, side, &current)?;
                    writeln!(self.out, "  ⚠️  Hours must be 0-23")?;
                }
                HourInput::Converted { hours, am_pm } => {
                    writeln!(self.out, "  → {hours} {am_pm}")?;
                    break;
                }
                HourInput::Kept(_) => break,
            }
        }

        loop {
            let current = time(&*form).minutes;
            let Some(answer) = self.ask(&format!("{name} minutes"), &current)? else {
                break;
            };
            let minutes = form.input_minutes(row, side, &answer)?;
            if minutes.is_empty() {
                form.input_minutes(row, side, &current)?;
                writeln!(self.out, "  ⚠️  Minutes must be 0-59")?;
                continue;
            }
            if minutes != answer.trim() {
                writeln!(self.out, "  → {minutes}")?;
            }
            break;
        }

        loop {
            let current = time(&*form).am_pm;
            let Some(answer) = self.ask(&format!("{name} AM/PM"), current.as_str())? else {
                break;
            };
            match AmPm::parse(&answer) {
                Some(am_pm) => {
                    form.select_am_pm(row, side, am_pm)?;
                    break;
                }
                None => writeln!(self.out, "  ⚠️  Enter AM or PM")?,
            }
        }
        Ok(())
    }
}
