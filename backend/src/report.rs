//! Aggregations over the whole collection: songs grouped by author and user indicators.

use std::collections::BTreeMap;

use common::{AuthorReport, Role, SongDto, UserDto, UserIndicators};

pub const UNCATEGORIZED: &str = "Sin Categoría";
pub const NO_CATEGORY: &str = "N/A";

#[derive(Default)]
struct AuthorTally {
    total_songs: usize,
    release_years: Vec<i64>,
    // First-seen order, which decides ties.
    categories: Vec<(String, usize)>,
}

impl AuthorTally {
    fn add(&mut self, song: &SongDto) {
        self.total_songs += 1;

        if let Some(year) = song.release_year.filter(|year| *year != 0) {
            self.release_years.push(year);
        }

        let category = if song.category.is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            song.category.trim().to_string()
        };
        match self.categories.iter_mut().find(|(name, _)| *name == category) {
            Some((_, count)) => *count += 1,
            None => self.categories.push((category, 1)),
        }
    }

    fn finish(self) -> AuthorReport {
        let average_release_year = floored_mean(&self.release_years);

        let most_frequent_category = self
            .categories
            .iter()
            .fold(None::<&(String, usize)>, |best, entry| match best {
                Some(current) if current.1 >= entry.1 => Some(current),
                _ => Some(entry),
            })
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| NO_CATEGORY.to_string());

        AuthorReport {
            total_songs: self.total_songs,
            release_years: self.release_years,
            categories: self.categories.into_iter().collect(),
            average_release_year,
            most_frequent_category,
        }
    }
}

/// Floor of the mean, summed in `i128` so stored values can never overflow it.
fn floored_mean(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let total: i128 = values.iter().map(|value| i128::from(*value)).sum();
    // The mean lies between the smallest and largest value, so it fits in i64.
    i64::try_from(total.div_euclid(values.len() as i128)).ok()
}

/// Groups songs by trimmed author. Songs without an author are left out.
pub fn songs_by_author(songs: &[SongDto]) -> BTreeMap<String, AuthorReport> {
    let mut tallies: BTreeMap<String, AuthorTally> = BTreeMap::new();
    for song in songs.iter().filter(|song| !song.author.is_empty()) {
        tallies
            .entry(song.author.trim().to_string())
            .or_default()
            .add(song);
    }

    tallies
        .into_iter()
        .map(|(author, tally)| (author, tally.finish()))
        .collect()
}

pub fn user_indicators(users: &[UserDto]) -> UserIndicators {
    let active_users = users.iter().filter(|user| user.is_active).count();
    let admins = users.iter().filter(|user| user.role == Role::Admin).count();
    let ages: Vec<i64> = users.iter().filter_map(|user| user.age).collect();
    let average_age = floored_mean(&ages);

    UserIndicators {
        total_users: users.len(),
        active_users,
        inactive_users: users.len() - active_users,
        admins,
        regular_users: users.len() - admins,
        average_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(author: &str, release_year: Option<i64>, category: &str) -> SongDto {
        SongDto {
            id: format!("{author}-{category}-{release_year:?}"),
            title: format!("{author} {category}"),
            author: author.to_string(),
            release_year,
            language: None,
            category: category.to_string(),
            duration: 0.0,
            created_by: "creator".to_string(),
        }
    }

    #[test]
    fn groups_and_averages_per_author() {
        let report = songs_by_author(&[
            song("A", Some(2000), "Rock"),
            song("A", Some(2010), "Rock"),
            song("B", None, "Pop"),
        ]);

        let a = &report["A"];
        assert_eq!(a.total_songs, 2);
        assert_eq!(a.average_release_year, Some(2005));
        assert_eq!(a.most_frequent_category, "Rock");
        assert_eq!(a.categories.get("Rock"), Some(&2));

        let b = &report["B"];
        assert_eq!(b.total_songs, 1);
        assert_eq!(b.average_release_year, None);
        assert_eq!(b.most_frequent_category, "Pop");
    }

    #[test]
    fn average_is_floored() {
        let report = songs_by_author(&[song("A", Some(2000), "Rock"), song("A", Some(2001), "Rock")]);
        assert_eq!(report["A"].average_release_year, Some(2000));
    }

    #[test]
    fn zero_years_are_ignored() {
        let report = songs_by_author(&[song("A", Some(0), "Rock"), song("A", Some(1990), "Rock")]);
        assert_eq!(report["A"].release_years, vec![1990]);
        assert_eq!(report["A"].average_release_year, Some(1990));
    }

    #[test]
    fn ties_go_to_the_first_category_seen() {
        let report = songs_by_author(&[
            song("A", Some(2000), "Jazz"),
            song("A", Some(2000), "Blues"),
            song("A", Some(2000), "Blues"),
            song("A", Some(2000), "Jazz"),
        ]);
        assert_eq!(report["A"].most_frequent_category, "Jazz");
    }

    #[test]
    fn authors_and_categories_are_trimmed() {
        let report = songs_by_author(&[song(" A ", Some(1999), " Rock "), song("A", Some(2001), "Rock")]);
        assert_eq!(report.len(), 1);
        assert_eq!(report["A"].total_songs, 2);
        assert_eq!(report["A"].categories.get("Rock"), Some(&2));
    }

    #[test]
    fn songs_without_author_are_skipped_and_blank_categories_are_labelled() {
        let report = songs_by_author(&[song("", Some(2000), "Rock"), song("C", Some(2000), "")]);
        assert_eq!(report.len(), 1);
        assert_eq!(report["C"].most_frequent_category, UNCATEGORIZED);
    }

    #[test]
    fn indicators_count_roles_and_states() {
        let user = |id: &str, role: Role, is_active: bool, age: Option<i64>| UserDto {
            id: id.to_string(),
            name: id.to_string(),
            lastname: "Doe".to_string(),
            email: format!("{id}@example.com"),
            age,
            role,
            is_active,
        };
        let indicators = user_indicators(&[
            user("a", Role::Admin, true, Some(30)),
            user("b", Role::User, false, Some(21)),
            user("c", Role::User, true, None),
        ]);
        assert_eq!(
            indicators,
            UserIndicators {
                total_users: 3,
                active_users: 2,
                inactive_users: 1,
                admins: 1,
                regular_users: 2,
                average_age: Some(25),
            }
        );
        assert_eq!(user_indicators(&[]).average_age, None);
    }

    #[test]
    fn huge_ages_do_not_overflow_the_average() {
        let user = |id: &str, age: i64| UserDto {
            id: id.to_string(),
            name: id.to_string(),
            lastname: "Doe".to_string(),
            email: format!("{id}@example.com"),
            age: Some(age),
            role: Role::User,
            is_active: true,
        };
        let indicators = user_indicators(&[user("a", i64::MAX), user("b", i64::MAX), user("c", i64::MAX)]);
        assert_eq!(indicators.average_age, Some(i64::MAX));

        let indicators = user_indicators(&[user("a", i64::MIN), user("b", i64::MIN + 1)]);
        assert_eq!(indicators.average_age, Some(i64::MIN));
    }
}
