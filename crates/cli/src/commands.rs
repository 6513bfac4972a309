use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _};
use chrono::NaiveDate;
use clap::Args;
use tally_core::{Receipt, ReceiptEdits, ReceiptId, TallyConfig};
use tally_ocr::{
    summary_total, FieldSource, JsonFragmentBackend, ReceiptPipeline, ReceiptView, ResolvedField,
    ScanResult, MISSING_PLACEHOLDER,
};
use tally_storage::DbPool;

pub struct Context {
    pub db: DbPool,
    pub config: TallyConfig,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub store: Option<String>,
    /// Receipt date as YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub subtotal: Option<String>,
    #[arg(long)]
    pub tax: Option<String>,
    #[arg(long)]
    pub total: Option<String>,
}

impl EditArgs {
    fn edits(&self) -> ReceiptEdits {
        ReceiptEdits {
            store_name: self.store.clone(),
            date: self.date,
            subtotal: self.subtotal.clone(),
            tax: self.tax.clone(),
            total: self.total.clone(),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

fn parse_id(s: &str) -> anyhow::Result<ReceiptId> {
    s.parse::<ReceiptId>().with_context(|| format!("'{s}' is not a receipt id"))
}

async fn load(ctx: &Context, id: ReceiptId) -> anyhow::Result<Receipt> {
    tally_storage::get_receipt(&ctx.db, id)
        .await?
        .ok_or_else(|| anyhow!("No receipt with id {id}"))
}

fn amount(config: &TallyConfig, field: &ResolvedField) -> String {
    match &field.value {
        Some(v) => format!("{}{v}", config.currency_symbol),
        None => MISSING_PLACEHOLDER.to_string(),
    }
}

fn marker(source: FieldSource) -> &'static str {
    match source {
        FieldSource::Edited => " (edited)",
        _ => "",
    }
}

async fn store_new(ctx: &Context, result: ScanResult) -> anyhow::Result<()> {
    tally_storage::insert_receipt(&ctx.db, &result.receipt).await?;
    tracing::info!("Receipt stored: {}", result.receipt.id());
    println!("{}  {}", result.receipt.id(), result.receipt.title());
    Ok(())
}

pub async fn scan(ctx: &Context, fragments: &Path) -> anyhow::Result<()> {
    tracing::info!("Processing fragments: {}", fragments.display());
    let pipeline = ReceiptPipeline::new(JsonFragmentBackend);
    let result = pipeline
        .process_file(fragments)
        .await
        .with_context(|| format!("Failed to process {}", fragments.display()))?;
    store_new(ctx, result).await
}

pub async fn add(ctx: &Context, source: &str) -> anyhow::Result<()> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read {source}"))?
    };
    let result = tally_ocr::process_lines(text.lines())?;
    store_new(ctx, result).await
}

pub async fn list(ctx: &Context) -> anyhow::Result<()> {
    let receipts = tally_storage::list_receipts(&ctx.db).await?;
    if receipts.is_empty() {
        println!("No receipts yet");
        return Ok(());
    }
    for r in receipts {
        let total = match summary_total(r.lines()) {
            Some(t) => format!("{}{t}", ctx.config.currency_symbol),
            None => String::new(),
        };
        println!(
            "{}  {}  {:<30}  {}",
            r.id(),
            r.created_at().format("%Y-%m-%d %H:%M"),
            r.title(),
            total
        );
    }
    Ok(())
}

pub async fn show(ctx: &Context, id: &str, all_lines: bool, json: bool) -> anyhow::Result<()> {
    let receipt = load(ctx, parse_id(id)?).await?;
    let view = ReceiptView::resolve(&receipt);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    let config = &ctx.config;

    println!("Store:    {}{}", view.store_name.display(MISSING_PLACEHOLDER), marker(view.store_name.source));
    println!("Date:     {}{}", view.date, marker(view.date_source));
    println!("Subtotal: {}{}", amount(config, &view.subtotal), marker(view.subtotal.source));
    println!("Tax:      {}{}", amount(config, &view.tax), marker(view.tax.source));
    println!("Total:    {}{}", amount(config, &view.total), marker(view.total.source));
    if view.is_edited {
        println!("(has user edits)");
    }

    if all_lines {
        println!();
        for line in &view.typed_lines {
            println!("{:<9} {}", line.kind.to_string(), line.original);
        }
    }
    Ok(())
}

pub async fn edit(ctx: &Context, args: EditArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let mut receipt = load(ctx, id).await?;
    let edits = args.edits();
    if edits.is_empty() {
        bail!("Nothing to edit; pass at least one of --store, --date, --subtotal, --tax, --total");
    }
    receipt.update_edits(edits);
    tally_storage::update_receipt_edits(&ctx.db, id, receipt.edits()).await?;
    tracing::info!("Receipt edited: {id}");
    Ok(())
}

pub async fn reset(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    if !tally_storage::clear_receipt_edits(&ctx.db, id).await? {
        bail!("No receipt with id {id}");
    }
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    if !tally_storage::delete_receipt(&ctx.db, id).await? {
        bail!("No receipt with id {id}");
    }
    Ok(())
}

pub async fn clear(ctx: &Context) -> anyhow::Result<()> {
    let removed = tally_storage::delete_all_receipts(&ctx.db).await?;
    println!("Removed {removed} receipt(s)");
    Ok(())
}
