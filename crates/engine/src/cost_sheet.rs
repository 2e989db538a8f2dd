//! Cost entry model: the lines of the calculation being edited.
//!
//! The total follows a two-phase rule. Absolute values are summed into a
//! base first, then every percentage is applied to that base. Percentages
//! never compound with each other, so line order does not matter.

use chrono::NaiveDateTime;

use crate::{
    EngineError, LineValue, References, ResultEngine,
    amount::{self, Amount},
    history::{HistoryRecord, PERCENT_SUFFIX, TOTAL_COLUMN},
};

/// Label used when a line is saved without a name.
pub const UNNAMED_ARTICLE: &str = "Без названия";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostLine {
    pub label: String,
    pub raw_value: String,
}

impl CostLine {
    pub fn new(label: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            raw_value: raw_value.into(),
        }
    }

    pub fn value(&self) -> LineValue {
        LineValue::parse(&self.raw_value)
    }
}

/// Sum of the absolute lines.
pub fn base_total<'a>(values: impl IntoIterator<Item = &'a str>) -> f64 {
    values
        .into_iter()
        .map(|raw| LineValue::parse(raw).absolute())
        .sum()
}

/// Two-phase total of raw line values.
///
/// ```rust
/// use engine::calculate_total;
///
/// assert_eq!(calculate_total(["100", "10%"]), 110.0);
/// assert_eq!(calculate_total(["50", "abc", "20%"]), 60.0);
/// ```
pub fn calculate_total<'a>(values: impl IntoIterator<Item = &'a str>) -> f64 {
    let parsed: Vec<LineValue> = values.into_iter().map(LineValue::parse).collect();
    let base: f64 = parsed.iter().map(|v| v.absolute()).sum();
    let percents: f64 = parsed
        .iter()
        .filter(|v| v.is_percent())
        .map(|v| v.resolve(base))
        .sum();
    base + percents
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostSheet {
    lines: Vec<CostLine>,
}

impl CostSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CostLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_line(&mut self, label: &str, raw_value: &str) {
        self.lines.push(CostLine::new(label, raw_value));
    }

    pub fn remove_line(&mut self, index: usize) -> ResultEngine<CostLine> {
        if index >= self.lines.len() {
            return Err(EngineError::KeyNotFound(format!("line #{index}")));
        }
        Ok(self.lines.remove(index))
    }

    /// Renames a line and pre-fills its value from `references` when the
    /// value is still empty.
    pub fn set_label(
        &mut self,
        index: usize,
        label: &str,
        references: &References,
    ) -> ResultEngine<()> {
        let line = self.line_mut(index)?;
        line.label = label.to_string();
        fill_from_reference(line, references);
        Ok(())
    }

    pub fn set_value(&mut self, index: usize, raw_value: &str) -> ResultEngine<()> {
        self.line_mut(index)?.raw_value = raw_value.to_string();
        Ok(())
    }

    /// Fills every empty value whose label has a reference entry.
    /// Non-empty values are never overwritten. Returns how many were filled.
    pub fn apply_defaults(&mut self, references: &References) -> usize {
        let mut filled = 0;
        for line in &mut self.lines {
            if fill_from_reference(line, references) {
                filled += 1;
            }
        }
        filled
    }

    fn line_mut(&mut self, index: usize) -> ResultEngine<&mut CostLine> {
        self.lines
            .get_mut(index)
            .ok_or_else(|| EngineError::KeyNotFound(format!("line #{index}")))
    }

    pub fn base_total(&self) -> f64 {
        base_total(self.lines.iter().map(|l| l.raw_value.as_str()))
    }

    pub fn total(&self) -> f64 {
        calculate_total(self.lines.iter().map(|l| l.raw_value.as_str()))
    }

    /// Indices of lines whose value is unreadable and counts as zero.
    pub fn invalid_lines(&self) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.value().is_invalid())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Builds the history row for this sheet.
    ///
    /// Percent lines store their computed amount under the label and the
    /// literal percent text in the shadow column. When two lines share a
    /// label the later one owns the column, shadow included. Date, project
    /// and total are written last, so a line named like one of them never
    /// replaces it.
    pub fn to_record(&self, project: &str, timestamp: NaiveDateTime) -> HistoryRecord {
        let base = self.base_total();
        let mut record = HistoryRecord::default();

        for line in &self.lines {
            let label = match line.label.trim() {
                "" => UNNAMED_ARTICLE,
                label => label,
            };
            let value = line.value();
            let shadow = format!("{label}{PERCENT_SUFFIX}");
            record.set(label, amount::format_cell(value.resolve(base)));
            if value.is_percent() {
                record.set(&shadow, amount::normalize(&line.raw_value));
            } else {
                record.remove(&shadow);
            }
        }

        record.stamp(timestamp, project.trim());
        record.set(TOTAL_COLUMN, amount::format_cell(self.total()));
        record
    }

    /// Re-hydrates the lines of a saved row.
    ///
    /// Percent articles get their saved percent text back, the others their
    /// amount with two decimals. Articles left empty in that row are skipped.
    pub fn from_record(record: &HistoryRecord) -> Self {
        let lines = record
            .articles()
            .filter(|(_, cell)| !cell.trim().is_empty())
            .map(|(article, cell)| {
                let raw_value = match record.percent_text(article).map(str::trim) {
                    Some(text) if text.ends_with('%') => text.to_string(),
                    _ => Amount(amount::parse_cell(cell)).to_string(),
                };
                CostLine::new(article, raw_value)
            })
            .collect();
        Self { lines }
    }
}

fn fill_from_reference(line: &mut CostLine, references: &References) -> bool {
    if !line.raw_value.trim().is_empty() {
        return false;
    }
    match references.get(&line.label) {
        Some(value) => {
            line.raw_value = value.to_string();
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn sheet(lines: &[(&str, &str)]) -> CostSheet {
        let mut sheet = CostSheet::new();
        for (label, value) in lines {
            sheet.add_line(label, value);
        }
        sheet
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
    }

    #[test]
    fn absolute_entries_are_summed() {
        assert_eq!(calculate_total(["10", "20,5", "0.5"]), 31.0);
        assert_eq!(calculate_total(std::iter::empty()), 0.0);
    }

    #[test]
    fn percent_applies_to_absolute_base() {
        assert_eq!(calculate_total(["100", "10%"]), 110.0);
        assert_eq!(calculate_total(["10%", "100", "10%"]), 120.0);
    }

    #[test]
    fn invalid_entries_count_as_zero() {
        assert_eq!(calculate_total(["50", "abc", "20%"]), 60.0);
        assert_eq!(calculate_total(["50", "x%", ""]), 50.0);
    }

    #[test]
    fn percent_only_sheet_totals_zero() {
        assert_eq!(calculate_total(["15%", "5%"]), 0.0);
    }

    #[test]
    fn invalid_lines_are_reported() {
        let sheet = sheet(&[("a", "1"), ("b", "abc"), ("c", "5%"), ("d", "?%")]);
        assert_eq!(sheet.invalid_lines(), vec![1, 3]);
    }

    #[test]
    fn references_fill_only_empty_values() {
        let refs: References = [("Аренда", "1500"), ("Налог", "13%")].into_iter().collect();
        let mut sheet = sheet(&[("Аренда", ""), ("Налог", "20%"), ("Свет", "")]);
        assert_eq!(sheet.apply_defaults(&refs), 1);
        assert_eq!(sheet.lines()[0].raw_value, "1500");
        assert_eq!(sheet.lines()[1].raw_value, "20%");
        assert_eq!(sheet.lines()[2].raw_value, "");
    }

    #[test]
    fn set_label_prefills_from_references() {
        let refs: References = [("Налог", "13%")].into_iter().collect();
        let mut sheet = sheet(&[("", ""), ("", "7")]);
        sheet.set_label(0, "Налог", &refs).unwrap();
        sheet.set_label(1, "Налог", &refs).unwrap();
        assert_eq!(sheet.lines()[0].raw_value, "13%");
        assert_eq!(sheet.lines()[1].raw_value, "7");
        assert!(sheet.set_label(5, "Налог", &refs).is_err());
    }

    #[test]
    fn remove_line_recomputes_total() {
        let mut sheet = sheet(&[("a", "100"), ("b", "10%")]);
        let removed = sheet.remove_line(0).unwrap();
        assert_eq!(removed.label, "a");
        assert_eq!(sheet.total(), 0.0);
        assert!(sheet.remove_line(3).is_err());
    }

    #[test]
    fn record_keeps_percent_text_in_shadow_column() {
        let sheet = sheet(&[("Аренда", "100"), ("Налог", "10,5%"), ("", "abc")]);
        let record = sheet.to_record(" Дом ", timestamp());

        assert_eq!(record.get("Дата"), Some("2024-03-01 09:30:00"));
        assert_eq!(record.project(), "Дом");
        assert_eq!(record.get("Аренда"), Some("100.0"));
        assert_eq!(record.get("Налог"), Some("10.5"));
        assert_eq!(record.get("Налог (процент)"), Some("10.5%"));
        assert_eq!(record.get("Без названия"), Some("0.0"));
        assert_eq!(record.get("Итого"), Some("110.5"));
    }

    #[test]
    fn record_round_trips_into_lines() {
        let sheet = sheet(&[("Аренда", "100"), ("Налог", "10%")]);
        let record = sheet.to_record("Дом", timestamp());
        let restored = CostSheet::from_record(&record);

        assert_eq!(
            restored.lines(),
            [CostLine::new("Аренда", "100.00"), CostLine::new("Налог", "10%")]
        );
        assert_eq!(restored.total(), 110.0);
    }

    #[test]
    fn line_named_like_a_fixed_column_does_not_replace_it() {
        let sheet = sheet(&[("Проект", "100"), ("Дата", "5"), ("Итого", "1")]);
        let record = sheet.to_record("Дом", timestamp());

        assert_eq!(record.project(), "Дом");
        assert_eq!(record.timestamp(), Some(timestamp()));
        assert_eq!(record.total(), 106.0);
    }

    #[test]
    fn later_absolute_line_drops_the_percent_text() {
        let sheet = sheet(&[("Аренда", "100"), ("Налог", "10%"), ("Налог", "50")]);
        let record = sheet.to_record("Дом", timestamp());

        assert_eq!(record.get("Налог"), Some("50.0"));
        assert_eq!(record.percent_text("Налог"), None);
        assert_eq!(record.get("Итого"), Some("165.0"));
        assert_eq!(
            CostSheet::from_record(&record).lines(),
            [CostLine::new("Аренда", "100.00"), CostLine::new("Налог", "50.00")]
        );
    }

    #[test]
    fn later_percent_line_owns_the_label() {
        let sheet = sheet(&[("Аренда", "100"), ("Налог", "50"), ("Налог", "10%")]);
        let record = sheet.to_record("Дом", timestamp());

        assert_eq!(record.get("Налог"), Some("15.0"));
        assert_eq!(record.percent_text("Налог"), Some("10%"));
        assert_eq!(
            CostSheet::from_record(&record).lines(),
            [CostLine::new("Аренда", "100.00"), CostLine::new("Налог", "10%")]
        );
    }

    #[test]
    fn set_value_replaces_the_raw_text() {
        let mut sheet = sheet(&[("Аренда", "100"), ("Налог", "")]);
        sheet.set_value(1, "20%").unwrap();
        assert_eq!(sheet.lines()[1].raw_value, "20%");
        assert_eq!(sheet.total(), 120.0);
        assert_eq!(
            sheet.set_value(2, "1"),
            Err(EngineError::KeyNotFound("line #2".to_string()))
        );
    }

    #[test]
    fn empty_cells_are_not_rehydrated() {
        let mut record = HistoryRecord::default();
        record.set("Аренда", "12");
        record.set("Свет", "");
        record.set("Итого", "12");
        let restored = CostSheet::from_record(&record);
        assert_eq!(restored.lines(), [CostLine::new("Аренда", "12.00")]);
    }
}
