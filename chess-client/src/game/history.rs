//! 走法记录列表

use protocol::GameRecord;

/// 记录中的一步
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCell {
    pub notation: String,
    /// 走完这一步后的下标（点击时跳转到这里）
    pub step: usize,
    /// 是否为当前显示的一步
    pub active: bool,
}

/// 一个回合：白方一步，黑方可选一步
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub number: usize,
    pub white: HistoryCell,
    pub black: Option<HistoryCell>,
}

/// 按回合分组，`displayed_index` 对应的一步标记为当前
pub fn history_rows(record: &GameRecord, displayed_index: usize) -> Vec<HistoryRow> {
    let cell = |ply: usize| -> Option<HistoryCell> {
        let notation = record.history.get(ply)?;
        let step = ply + 1;
        Some(HistoryCell {
            notation: notation.clone(),
            step,
            active: step == displayed_index,
        })
    };

    (0..record.ply_count())
        .step_by(2)
        .filter_map(|ply| {
            Some(HistoryRow {
                number: ply / 2 + 1,
                white: cell(ply)?,
                black: cell(ply + 1),
            })
        })
        .collect()
}

/// 渲染为文本，当前一步用 `>` 标记
pub fn history_text(rows: &[HistoryRow]) -> String {
    let fmt = |cell: &HistoryCell| {
        let marker = if cell.active { '>' } else { ' ' };
        format!("{}{:<8}", marker, cell.notation)
    };
    rows.iter()
        .map(|row| {
            let black = row.black.as_ref().map(fmt).unwrap_or_default();
            format!("{:>3}. {}{}", row.number, fmt(&row.white), black)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::INITIAL_FEN;

    fn record(moves: &[&str]) -> GameRecord {
        let mut record = GameRecord::new(INITIAL_FEN);
        for (i, m) in moves.iter().enumerate() {
            record.push(*m, format!("p{}", i + 1));
        }
        record
    }

    #[test]
    fn test_rows_pair_moves() {
        let rows = history_rows(&record(&["e4", "e5", "Nf3"]), 3);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 1);
        assert_eq!(rows[0].white.notation, "e4");
        assert_eq!(rows[0].black.as_ref().unwrap().step, 2);
        assert_eq!(rows[1].number, 2);
        assert!(rows[1].black.is_none());
        assert!(rows[1].white.active);
        assert!(!rows[0].white.active);
    }

    #[test]
    fn test_initial_position_has_no_active_cell() {
        let rows = history_rows(&record(&["e4", "e5"]), 0);
        assert!(rows.iter().all(|r| !r.white.active && !r.black.as_ref().is_some_and(|c| c.active)));
        assert!(history_rows(&record(&[]), 0).is_empty());
    }

    #[test]
    fn test_history_text() {
        let rows = history_rows(&record(&["e4", "e5", "Nf3"]), 2);
        let text = history_text(&rows);
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap().contains(">e5"));
        assert!(text.starts_with("  1.  e4"));
    }
}
