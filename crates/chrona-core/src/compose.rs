use chrono::{Datelike, NaiveDate, Weekday};

use crate::bar::RenderedBar;
use crate::progress::YearProgress;

/// Single-character Japanese weekday name.
pub fn weekday_ja(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

/// Compose the post body: date header, elapsed/total/remaining line, bar, sentence.
pub fn compose(
    date: NaiveDate,
    progress: &YearProgress,
    bar: &RenderedBar,
    sentence: &str,
) -> String {
    format!(
        "本日は{year}年{month}月{day}日（{weekday}）\n\n\
         ⏳ 経過日数：{elapsed}日 / {total}日（残り{remaining}日）\n\
         📈 進行度：{bar}\n\n\
         {sentence}",
        year = date.year(),
        month = date.month(),
        day = date.day(),
        weekday = weekday_ja(date.weekday()),
        elapsed = progress.day_of_year,
        total = progress.total_days,
        remaining = progress.remaining_days(),
        bar = bar,
        sentence = sentence,
    )
}
