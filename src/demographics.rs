//! Affected-population reporting.
//!
//! Everything here is pure: handlers load flat rows from the database and the
//! functions below fold them into the report shapes the client renders.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use sea_orm::FromQueryResult;
use serde::Serialize;

use crate::entities::{family, family_member};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("male") {
            Gender::Male
        } else if value.eq_ignore_ascii_case("female") {
            Gender::Female
        } else {
            Gender::Other
        }
    }
}

/// Closed integer age ranges used by the impact report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeBracket {
    Children,
    Teens,
    Adults,
    Seniors,
}

impl AgeBracket {
    pub fn classify(age: i32) -> Option<Self> {
        match age {
            0..=12 => Some(AgeBracket::Children),
            13..=19 => Some(AgeBracket::Teens),
            20..=59 => Some(AgeBracket::Adults),
            60.. => Some(AgeBracket::Seniors),
            _ => None,
        }
    }
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years
}

/// Stored age if present, otherwise derived from the birth date.
pub fn effective_age(age: Option<i32>, birth_date: Option<NaiveDate>, today: NaiveDate) -> Option<i32> {
    age.or_else(|| birth_date.map(|born| age_on(born, today)))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenderCount {
    pub males: u64,
    pub females: u64,
}

impl GenderCount {
    fn add(&mut self, gender: Gender) {
        match gender {
            Gender::Male => self.males += 1,
            Gender::Female => self.females += 1,
            Gender::Other => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.males + self.females
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AgeSummary {
    pub children: GenderCount,
    pub teens: GenderCount,
    pub adults: GenderCount,
    pub seniors: GenderCount,
}

impl AgeSummary {
    fn bracket_mut(&mut self, bracket: AgeBracket) -> &mut GenderCount {
        match bracket {
            AgeBracket::Children => &mut self.children,
            AgeBracket::Teens => &mut self.teens,
            AgeBracket::Adults => &mut self.adults,
            AgeBracket::Seniors => &mut self.seniors,
        }
    }

    pub fn total(&self) -> u64 {
        self.children.total() + self.teens.total() + self.adults.total() + self.seniors.total()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub family_count: u64,
    pub total_male_members: u64,
    pub total_female_members: u64,
    pub summary: AgeSummary,
}

impl ImpactSummary {
    /// Counts one person. People of unknown age still count toward the
    /// gender totals but land in no bracket.
    fn record(&mut self, gender: &str, age: Option<i32>) {
        let gender = Gender::parse(gender);
        match gender {
            Gender::Male => self.total_male_members += 1,
            Gender::Female => self.total_female_members += 1,
            Gender::Other => return,
        }
        if let Some(bracket) = age.and_then(AgeBracket::classify) {
            self.summary.bracket_mut(bracket).add(gender);
        }
    }
}

/// Builds the impact summary over grouped families. Returns `None` when no
/// family is affected, which the API reports as "not found" rather than a
/// zero-filled summary.
pub fn summarize(families: &[FamilyDetail], today: NaiveDate) -> Option<ImpactSummary> {
    if families.is_empty() {
        return None;
    }

    let mut report = ImpactSummary {
        family_count: families.len() as u64,
        ..Default::default()
    };
    for family in families {
        report.record(
            &family.gender,
            effective_age(family.age, family.birth_date, today),
        );
        for member in &family.members {
            report.record(
                &member.gender,
                effective_age(member.age, Some(member.birth_date), today),
            );
        }
    }
    Some(report)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub member_id: i32,
    pub name: String,
    pub age: Option<i32>,
    pub gender: String,
    pub status: String,
    pub birth_date: NaiveDate,
    pub phone: Option<String>,
    pub image: Option<String>,
}

impl From<family_member::Model> for MemberDetail {
    fn from(member: family_member::Model) -> Self {
        Self {
            member_id: member.id,
            name: member.name,
            age: member.age,
            gender: member.gender,
            status: member.status,
            birth_date: member.birth_date,
            phone: member.phone,
            image: member.image,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDetail {
    pub family_id: i32,
    pub representative: String,
    pub residency_type: String,
    pub owner_name: Option<String>,
    pub age: Option<i32>,
    pub gender: String,
    pub birth_date: Option<NaiveDate>,
    pub status: String,
    pub phone: Option<String>,
    pub purok: String,
    pub members: Vec<MemberDetail>,
}

impl From<family::Model> for FamilyDetail {
    fn from(family: family::Model) -> Self {
        Self {
            family_id: family.id,
            representative: family.representative,
            residency_type: family.residency_type,
            owner_name: family.owner_name,
            age: family.age,
            gender: family.gender,
            birth_date: family.birth_date,
            status: family.status,
            phone: family.phone,
            purok: family.purok,
            members: Vec::new(),
        }
    }
}

/// Folds flat `family LEFT JOIN family_member` rows into one entry per family,
/// ordered by family id. The first row seen for a family supplies its fields;
/// a member is appended only when the row carries one, and only once.
pub fn group_family_rows<I>(rows: I) -> Vec<FamilyDetail>
where
    I: IntoIterator<Item = (family::Model, Option<family_member::Model>)>,
{
    let grouped = rows.into_iter().fold(
        BTreeMap::<i32, FamilyDetail>::new(),
        |mut families, (family, member)| {
            let entry = families
                .entry(family.id)
                .or_insert_with(|| FamilyDetail::from(family));
            if let Some(member) = member {
                if !entry.members.iter().any(|m| m.member_id == member.id) {
                    entry.members.push(member.into());
                }
            }
            families
        },
    );
    grouped.into_values().collect()
}

/// Head count per purok and gender, as returned by the grouped queries.
#[derive(Clone, Debug, PartialEq, Eq, FromQueryResult)]
pub struct PurokGenderCount {
    pub purok: String,
    pub gender: String,
    pub count: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PurokPopulation {
    pub purok: String,
    pub male: u64,
    pub female: u64,
}

/// Merges representative and member head counts by purok. A purok absent from
/// one side contributes zero from that side. Output is ordered by purok.
pub fn merge_population(
    representatives: &[PurokGenderCount],
    members: &[PurokGenderCount],
) -> Vec<PurokPopulation> {
    let mut by_purok: BTreeMap<&str, PurokPopulation> = BTreeMap::new();
    for row in representatives.iter().chain(members) {
        let entry = by_purok
            .entry(row.purok.as_str())
            .or_insert_with(|| PurokPopulation {
                purok: row.purok.clone(),
                ..Default::default()
            });
        let count = u64::try_from(row.count).unwrap_or(0);
        match Gender::parse(&row.gender) {
            Gender::Male => entry.male += count,
            Gender::Female => entry.female += count,
            Gender::Other => {}
        }
    }
    by_purok.into_values().collect()
}

/// Distinct affected families per disaster type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTotal {
    pub disaster_type: String,
    pub total: u64,
}

/// Counts distinct families per disaster type from `(disaster_type, family_id)`
/// pairs, largest total first.
pub fn families_by_type<I>(links: I) -> Vec<TypeTotal>
where
    I: IntoIterator<Item = (String, i32)>,
{
    let mut by_type: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
    for (disaster_type, family_id) in links {
        by_type.entry(disaster_type).or_default().insert(family_id);
    }

    let mut totals: Vec<TypeTotal> = by_type
        .into_iter()
        .map(|(disaster_type, families)| TypeTotal {
            disaster_type,
            total: families.len() as u64,
        })
        .collect();
    // Stable sort keeps ties in type order
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    fn stamp() -> NaiveDateTime {
        today().and_hms_opt(8, 0, 0).unwrap()
    }

    fn family(id: i32, gender: &str, age: Option<i32>) -> family::Model {
        family::Model {
            id,
            representative: format!("Representative {id}"),
            purok: "1A".to_string(),
            age,
            gender: gender.to_string(),
            birth_date: None,
            status: "Married".to_string(),
            phone: None,
            residency_type: "Resident".to_string(),
            owner_name: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    fn member(id: i32, family_id: i32, gender: &str, age: i32) -> family_member::Model {
        family_member::Model {
            id,
            family_id,
            name: format!("Member {id}"),
            age: Some(age),
            gender: gender.to_string(),
            status: "Single".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2024 - age, 1, 1).unwrap(),
            phone: None,
            image: None,
            created_at: stamp(),
            updated_at: stamp(),
        }
    }

    #[test]
    fn brackets_use_closed_ranges() {
        assert_eq!(AgeBracket::classify(0), Some(AgeBracket::Children));
        assert_eq!(AgeBracket::classify(12), Some(AgeBracket::Children));
        assert_eq!(AgeBracket::classify(13), Some(AgeBracket::Teens));
        assert_eq!(AgeBracket::classify(19), Some(AgeBracket::Teens));
        assert_eq!(AgeBracket::classify(20), Some(AgeBracket::Adults));
        assert_eq!(AgeBracket::classify(59), Some(AgeBracket::Adults));
        assert_eq!(AgeBracket::classify(60), Some(AgeBracket::Seniors));
        assert_eq!(AgeBracket::classify(104), Some(AgeBracket::Seniors));
        assert_eq!(AgeBracket::classify(-1), None);
    }

    #[test]
    fn age_counts_whole_years() {
        let born = NaiveDate::from_ymd_opt(1990, 7, 2).unwrap();
        assert_eq!(age_on(born, today()), 33);
        let born = NaiveDate::from_ymd_opt(1990, 7, 1).unwrap();
        assert_eq!(age_on(born, today()), 34);
    }

    #[test]
    fn gender_parsing_is_case_insensitive() {
        assert_eq!(Gender::parse("Male"), Gender::Male);
        assert_eq!(Gender::parse(" female "), Gender::Female);
        assert_eq!(Gender::parse("unspecified"), Gender::Other);
    }

    #[test]
    fn grouping_keeps_representative_of_memberless_family() {
        let rows = vec![
            (family(2, "Female", Some(70)), None),
            (family(1, "Male", Some(40)), Some(member(10, 1, "Female", 38))),
            (family(1, "Male", Some(40)), Some(member(11, 1, "Male", 9))),
        ];
        let grouped = group_family_rows(rows);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].family_id, 1);
        assert_eq!(grouped[0].members.len(), 2);
        assert_eq!(grouped[1].family_id, 2);
        assert!(grouped[1].members.is_empty());
    }

    #[test]
    fn grouping_ignores_repeated_member_rows() {
        let rows = vec![
            (family(1, "Male", Some(40)), Some(member(10, 1, "Female", 38))),
            (family(1, "Male", Some(40)), Some(member(10, 1, "Female", 38))),
        ];
        let grouped = group_family_rows(rows);
        assert_eq!(grouped[0].members.len(), 1);
    }

    #[test]
    fn summary_counts_each_representative_once() {
        let rows = vec![
            (family(1, "Male", Some(40)), Some(member(10, 1, "Female", 38))),
            (family(1, "Male", Some(40)), Some(member(11, 1, "Male", 9))),
            (family(1, "Male", Some(40)), Some(member(12, 1, "Female", 15))),
            (family(2, "Female", Some(70)), None),
        ];
        let report = summarize(&group_family_rows(rows), today()).unwrap();

        assert_eq!(report.family_count, 2);
        assert_eq!(report.total_male_members, 2);
        assert_eq!(report.total_female_members, 3);
        assert_eq!(report.summary.children, GenderCount { males: 1, females: 0 });
        assert_eq!(report.summary.teens, GenderCount { males: 0, females: 1 });
        assert_eq!(report.summary.adults, GenderCount { males: 1, females: 1 });
        assert_eq!(report.summary.seniors, GenderCount { males: 0, females: 1 });
    }

    #[test]
    fn summary_totals_match_people_and_brackets_partition_them() {
        let mut rows = Vec::new();
        let mut member_id = 100;
        for family_id in 1..=4 {
            let gender = if family_id % 2 == 0 { "Female" } else { "Male" };
            let rep = family(family_id, gender, Some(18 + family_id * 11));
            for offset in 0..family_id {
                member_id += 1;
                let gender = if offset % 2 == 0 { "Male" } else { "Female" };
                rows.push((rep.clone(), Some(member(member_id, family_id, gender, offset * 17))));
            }
        }
        let families = group_family_rows(rows);
        let members: usize = families.iter().map(|f| f.members.len()).sum();
        let report = summarize(&families, today()).unwrap();

        assert_eq!(report.family_count, 4);
        assert_eq!(
            report.total_male_members + report.total_female_members,
            (4 + members) as u64
        );
        assert_eq!(
            report.summary.total(),
            report.total_male_members + report.total_female_members
        );
    }

    #[test]
    fn missing_age_falls_back_to_birth_date() {
        let mut rep = family(1, "Male", None);
        rep.birth_date = NaiveDate::from_ymd_opt(1950, 3, 3);
        let report = summarize(&group_family_rows(vec![(rep, None)]), today()).unwrap();
        assert_eq!(report.summary.seniors.males, 1);
    }

    #[test]
    fn unknown_age_counts_toward_gender_only() {
        let report = summarize(&group_family_rows(vec![(family(1, "Female", None), None)]), today())
            .unwrap();
        assert_eq!(report.total_female_members, 1);
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn no_families_is_not_a_zero_summary() {
        assert_eq!(summarize(&[], today()), None);
    }

    fn count(purok: &str, gender: &str, count: i64) -> PurokGenderCount {
        PurokGenderCount {
            purok: purok.to_string(),
            gender: gender.to_string(),
            count,
        }
    }

    #[test]
    fn population_merges_representatives_and_members() {
        let representatives = vec![count("1A", "Male", 2), count("1A", "Female", 1), count("2B", "Male", 1)];
        let members = vec![count("1A", "Male", 1), count("1A", "Female", 3)];

        let merged = merge_population(&representatives, &members);
        assert_eq!(
            merged,
            vec![
                PurokPopulation { purok: "1A".to_string(), male: 3, female: 4 },
                PurokPopulation { purok: "2B".to_string(), male: 1, female: 0 },
            ]
        );
    }

    #[test]
    fn type_totals_count_each_family_once() {
        let links = vec![
            ("Flood".to_string(), 1),
            ("Flood".to_string(), 1),
            ("Flood".to_string(), 2),
            ("Fire".to_string(), 3),
            ("Typhoon".to_string(), 1),
            ("Typhoon".to_string(), 4),
        ];
        let totals = families_by_type(links);
        assert_eq!(
            totals,
            vec![
                TypeTotal { disaster_type: "Flood".to_string(), total: 2 },
                TypeTotal { disaster_type: "Typhoon".to_string(), total: 2 },
                TypeTotal { disaster_type: "Fire".to_string(), total: 1 },
            ]
        );
    }
}
