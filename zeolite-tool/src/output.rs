use zeolite_core::{Query, QueryResults, SlotKey};

fn hours(start: SlotKey, slots: usize) -> String {
    format!("{start}-{:02}:00", usize::from(start.hour()) + slots)
}

pub fn print_query(query: &Query) {
    print!("{:?} {}", query.intent, query.date_range);
    if let Some(preference) = query.time_preference {
        print!(" {preference:?}");
    }
    if let Some(duration) = query.slot_duration {
        print!(" {duration:?}");
    }
    if let Some(count) = query.result_count {
        print!(" top {count}");
    }
    println!();
}

pub fn print_results(results: &QueryResults) {
    if results.is_empty() {
        println!("nothing free");
        return;
    }

    match results {
        QueryResults::Days(days) => {
            for day in days {
                match &day.event_label {
                    Some(label) => println!("{}  {} ({label})", day.date, day.state),
                    None => println!("{}  {}", day.date, day.state),
                }
            }
        }
        QueryResults::Slots(runs) => {
            for run in runs {
                println!("{}  {}  {}h", run.date, hours(run.start, run.slots), run.slots);
            }
        }
        QueryResults::Suggestions(suggestions) => {
            for (rank, suggestion) in suggestions.iter().enumerate() {
                println!(
                    "{:>2}. {}  {}  score {:.3}",
                    rank + 1,
                    suggestion.date,
                    hours(suggestion.start, suggestion.slots),
                    suggestion.score
                );
            }
        }
    }
}
