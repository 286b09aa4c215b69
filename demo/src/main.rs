//! DonorDB walkthrough binary.
//!
//! Runs a scripted tour of the engine against an in-memory store, or
//! against a JSON snapshot file when a path is passed as the first
//! argument. The snapshot is seeded on first use and survives reruns.

use std::env;
use std::error::Error;
use std::process;

use chrono::NaiveDate;
use donordb_core::{Donator, Province, ProvinceId};
use donordb_query::Direction;
use donordb_session::{Database, SessionResult, UnitOfWork};
use donordb_store::{JsonStore, MemoryStore, Store};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    match env::args().nth(1) {
        Some(path) => {
            let db = Database::new(JsonStore::open(path)?);
            seed_if_empty(&db)?;
            walkthrough(&db)?;
        }
        None => {
            let db = Database::new(MemoryStore::new());
            seed_if_empty(&db)?;
            walkthrough(&db)?;
        }
    }
    Ok(())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Seed the classic fixture when the store holds no provinces yet.
fn seed_if_empty<S: Store + 'static>(db: &Database<S>) -> SessionResult<()> {
    let uow = db.open_unit_of_work();
    if uow.provinces().count()? > 0 {
        return Ok(());
    }

    let shandong = uow.add_province(Province::new("Shandong"));
    let guangdong = uow.add_province(Province::new("Guangdong"));
    let zhejiang = uow.add_province(Province::new("Zhejiang"));

    uow.add_donator_to(
        Donator::new("Alice", Decimal::from(50), date(2016, 5, 30)),
        shandong,
    )?;
    uow.add_donator_to(
        Donator::new("Bob", Decimal::from(30), date(2016, 5, 25)),
        shandong,
    )?;
    uow.add_donator_to(
        Donator::new("Carol", Decimal::from(60), date(2016, 6, 2)),
        guangdong,
    )?;
    uow.add_donator_to(
        Donator::new("Dave", Decimal::from(25), date(2016, 6, 10)),
        guangdong,
    )?;
    uow.add_donator_to(
        Donator::new("Erin", Decimal::from(12), date(2016, 7, 1)),
        zhejiang,
    )?;

    let summary = uow.commit()?;
    println!("seeded: {summary}");
    Ok(())
}

fn walkthrough<S: Store + 'static>(db: &Database<S>) -> SessionResult<()> {
    queries(&db.open_unit_of_work())?;
    insert_province_with_donators(db)?;
    update_donation(db)?;
    cascade_delete(db)?;
    Ok(())
}

fn print_donators(title: &str, donators: &[Donator]) {
    println!("\n== {title} ==");
    for d in donators {
        let id = d
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(staged)".into());
        println!("  {:<14} {:<10} {:>8}  {}", id, d.name, d.amount, d.donate_date);
    }
}

fn queries<S: Store + 'static>(uow: &UnitOfWork<S>) -> SessionResult<()> {
    print_donators("all donators", &uow.donators().collect()?);

    // Filtering
    let generous = uow
        .donators()
        .filter(|d| d.amount >= Decimal::from(30))
        .collect()?;
    print_donators("donations of 30 or more", &generous);

    // Navigation, both directions
    let nav = uow.navigator();
    let of_first_province = nav.donators_of(ProvinceId::new(1))?;
    print_donators("donators of province 1", &of_first_province);
    if let Some(donator) = uow.donators().first()? {
        let province = nav.province_of(&donator)?;
        println!(
            "\n{} donates from {}",
            donator.name,
            province.map(|p| p.name).unwrap_or_else(|| "nowhere".into())
        );
    }

    // Projection
    let names = uow.donators().project(|d| d.name.clone()).collect()?;
    println!("\nnames: {}", names.join(", "));

    // Grouping with per-group aggregation
    println!("\n== donations per province ==");
    let groups = uow.donators().group_by(|d| d.province_id).collect()?;
    for group in groups {
        let total: Decimal = group.elements.iter().map(|d| d.amount).sum();
        let label = group
            .key
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unassigned".into());
        println!("  {:<12} {} donator(s), total {}", label, group.elements.len(), total);
    }

    // Group join keeps provinces without donators
    println!("\n== provinces with donator counts ==");
    let rows = uow.provinces().group_join(
        uow.donators(),
        |p| p.id,
        |d| d.province_id,
        |p, donators| (p.name.clone(), donators.len()),
    );
    for (name, count) in rows.collect()? {
        println!("  {name:<12} {count} donator(s)");
    }

    // Ordering and paging
    let richest = uow
        .donators()
        .order_by(|d| d.amount, Direction::Descending)
        .collect()?;
    print_donators("by amount, descending", &richest);
    let page = uow
        .donators()
        .order_by(|d| d.id, Direction::Ascending)
        .skip(2)
        .take(3)
        .collect()?;
    print_donators("page 2 (skip 2, take 3)", &page);

    // Aggregates
    let donators = uow.donators();
    println!("\ncount:   {}", donators.count()?);
    println!("sum:     {}", donators.sum(|d| d.amount)?);
    println!("min:     {:?}", donators.min(|d| d.amount)?);
    println!("max:     {:?}", donators.max(|d| d.amount)?);
    println!("average: {:?}", donators.average(|d| d.amount)?);

    Ok(())
}

fn insert_province_with_donators<S: Store + 'static>(db: &Database<S>) -> SessionResult<()> {
    let uow = db.open_unit_of_work();
    let fujian = uow.add_province(Province::new("Fujian"));
    uow.add_donator_to(
        Donator::new("Frank", Decimal::from(40), date(2016, 8, 1)),
        fujian,
    )?;
    uow.add_donator_to(
        Donator::new("Grace", Decimal::from(20), date(2016, 8, 2)),
        fujian,
    )?;
    let summary = uow.commit()?;
    println!("\ninsert: {summary}");
    Ok(())
}

fn update_donation<S: Store + 'static>(db: &Database<S>) -> SessionResult<()> {
    let uow = db.open_unit_of_work();
    if let Some(mut donator) = uow.donators().first()? {
        donator.amount += Decimal::from(5);
        uow.update_donator(donator)?;
        let summary = uow.commit()?;
        println!("update: {summary}");
    }
    Ok(())
}

fn cascade_delete<S: Store + 'static>(db: &Database<S>) -> SessionResult<()> {
    let uow = db.open_unit_of_work();
    uow.remove_province(ProvinceId::new(3))?;
    let summary = uow.commit()?;
    println!("cascade delete of province 3: {summary}");
    print_donators("remaining donators", &uow.donators().collect()?);
    Ok(())
}
