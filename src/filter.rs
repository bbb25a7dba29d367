//! Client-side filtering and grouping of the task collection.

use chrono::NaiveDate;

use crate::task::{Category, Task, TaskStatus};

/// Inclusive due-date window, whole days on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub category: Option<Category>,
    pub due: Option<DateRange>,
}

/// Keep the tasks matching every active predicate. The source is untouched.
///
/// Whitespace-only text disables the text predicate. Any other text is matched
/// as typed, surrounding spaces included.
pub fn apply_filters(tasks: &[Task], filter: &TaskFilter, text: &str) -> Vec<Task> {
    let needle = text.to_lowercase();
    let search = !text.trim().is_empty();
    tasks
        .iter()
        .filter(|task| {
            filter
                .category
                .map_or(true, |category| task.category.contains(&category))
        })
        .filter(|task| filter.due.map_or(true, |range| range.contains(task.due_date)))
        .filter(|task| !search || matches_text(task, &needle))
        .cloned()
        .collect()
}

fn matches_text(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle) || task.description.to_lowercase().contains(needle)
}

/// Tasks split into board columns, in board order.
pub fn group_by_status(tasks: &[Task]) -> [(TaskStatus, Vec<&Task>); 3] {
    TaskStatus::ALL.map(|status| {
        let column = tasks.iter().filter(|t| t.status == status).collect();
        (status, column)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn task(id: &str, title: &str, description: &str, due: NaiveDate, cats: &[Category]) -> Task {
        NewTask::new(title, due, cats.iter().copied())
            .with_description(description)
            .into_task(id.to_string(), "ada", Utc::now())
    }

    fn sample() -> Vec<Task> {
        vec![
            task("1", "Send invoice", "", date(2025, 3, 1), &[Category::Work]),
            task("2", "Gym", "leg day", date(2025, 3, 2), &[Category::Personal]),
            task("3", "Review", "check INVOICE totals", date(2025, 3, 3), &[Category::Work, Category::Personal]),
            task("4", "Invoice for flat", "", date(2025, 3, 4), &[Category::Personal]),
            task("5", "Standup", "daily sync", date(2025, 3, 5), &[Category::Work]),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn category_and_text_compose() {
        let filter = TaskFilter {
            category: Some(Category::Work),
            due: None,
        };
        let out = apply_filters(&sample(), &filter, "invoice");
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn date_range_is_inclusive_on_both_days() {
        let filter = TaskFilter {
            category: None,
            due: Some(DateRange::new(date(2025, 3, 2), date(2025, 3, 4))),
        };
        let out = apply_filters(&sample(), &filter, "");
        assert_eq!(ids(&out), vec!["2", "3", "4"]);
    }

    #[test]
    fn reversed_range_matches_nothing() {
        let filter = TaskFilter {
            category: None,
            due: Some(DateRange::new(date(2025, 3, 4), date(2025, 3, 2))),
        };
        assert!(apply_filters(&sample(), &filter, "").is_empty());
    }

    #[test]
    fn whitespace_text_is_ignored_but_query_is_not_trimmed() {
        let all = apply_filters(&sample(), &TaskFilter::default(), "   ");
        assert_eq!(all.len(), 5);

        let out = apply_filters(&sample(), &TaskFilter::default(), "DAILY");
        assert_eq!(ids(&out), vec!["5"]);

        // "daily sync" contains " sync" but nothing contains "  daily ".
        let out = apply_filters(&sample(), &TaskFilter::default(), " sync");
        assert_eq!(ids(&out), vec!["5"]);
        assert!(apply_filters(&sample(), &TaskFilter::default(), "  DAILY ").is_empty());
    }

    #[test]
    fn every_result_satisfies_all_predicates() {
        let tasks = sample();
        let ranges = [None, Some(DateRange::new(date(2025, 3, 1), date(2025, 3, 3)))];
        let categories = [None, Some(Category::Work), Some(Category::Personal)];
        let texts = ["", "invoice", "day", "zzz"];

        for due in ranges {
            for category in categories {
                for text in texts {
                    let filter = TaskFilter { category, due };
                    let out = apply_filters(&tasks, &filter, text);
                    assert_eq!(out, apply_filters(&tasks, &filter, text));
                    for t in &out {
                        assert!(tasks.contains(t));
                        assert!(category.map_or(true, |c| t.category.contains(&c)));
                        assert!(due.map_or(true, |r| r.contains(t.due_date)));
                        assert!(
                            text.is_empty()
                                || t.title.to_lowercase().contains(text)
                                || t.description.to_lowercase().contains(text)
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn groups_follow_board_order() {
        let mut tasks = sample();
        tasks[1].status = TaskStatus::Done;
        tasks[2].status = TaskStatus::InProgress;

        let groups = group_by_status(&tasks);
        assert_eq!(groups[0].0, TaskStatus::Pending);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[1].1[0].id, "3");
        assert_eq!(groups[2].1[0].id, "2");
    }
}
