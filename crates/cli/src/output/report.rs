//! Allocation report: chain budgets, safety-module cap and per-market speeds.

use alloy_primitives::U256;
use anyhow::Result;
use colored::Colorize;
use emissions_rs_engine::math::units_to_decimal;
use emissions_rs_engine::{chain_id, ChainAllocation, EpochAllocation, EpochWindow, MarketAllocation};
use rust_decimal::Decimal;
use tabled::Tabled;

use super::{format_pct, format_tokens, format_usd, render_table};
use crate::cli::OutputFormat;

/// Bridge fees are paid in the home chain's native gas token.
const NATIVE_FEE_DECIMALS: u32 = 18;

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Supply (USD)")]
    supply_usd: String,
    #[tabled(rename = "Borrow (USD)")]
    borrow_usd: String,
    #[tabled(rename = "Supply speed")]
    supply_speed: String,
    #[tabled(rename = "Borrow speed")]
    borrow_speed: String,
    #[tabled(rename = "Supply APR")]
    supply_apr: String,
    #[tabled(rename = "Borrow APR")]
    borrow_apr: String,
}

fn heading(text: &str, format: OutputFormat) -> String {
    if format == OutputFormat::Markdown {
        format!("## {}\n", text)
    } else {
        format!("{}\n", text.cyan().bold())
    }
}

fn truncate_address(addr: &str) -> String {
    if addr.len() > 10 {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

fn apr_change(before: Decimal, after: Decimal) -> String {
    format!("{} -> {}", format_pct(before), format_pct(after))
}

fn market_row(market: &MarketAllocation) -> MarketRow {
    let name = match &market.alias {
        Some(alias) if market.enabled => alias.clone(),
        Some(alias) => format!("{} (disabled)", alias),
        None => truncate_address(&market.address.to_string()),
    };
    let (supply_speed, borrow_speed) = market
        .protocol
        .map(|s| (format_tokens(s.supply.speed), format_tokens(s.borrow.speed)))
        .unwrap_or_else(|| ("-".to_string(), "-".to_string()));

    MarketRow {
        market: name,
        share: format_pct(market.share),
        supply_usd: format_usd(market.supply_usd),
        borrow_usd: format_usd(market.borrow_usd),
        supply_speed,
        borrow_speed,
        supply_apr: apr_change(market.apr.supply_before, market.apr.supply_after),
        borrow_apr: apr_change(market.apr.borrow_before, market.apr.borrow_after),
    }
}

fn format_units(value: U256, decimals: u32) -> Result<String> {
    Ok(format_tokens(units_to_decimal(value, decimals)?))
}

fn format_chain(chain: &ChainAllocation, window: &EpochWindow, format: OutputFormat) -> Result<String> {
    let mut output = String::new();
    let role = if chain.home { ", home" } else { "" };
    output.push_str(&heading(
        &format!("{} ({}{})", chain.chain, chain_id(chain.chain), role),
        format,
    ));

    output.push_str(&format!("  Total value:   {}\n", format_usd(chain.total_usd)));
    output.push_str(&format!("  Chain share:   {}\n", format_pct(chain.share)));
    output.push_str(&format!("  Token price:   {}\n", format_usd(chain.protocol_token_price)));
    output.push_str(&format!("  Markets:       {}\n", format_tokens(chain.budget.markets)));
    output.push_str(&format!("  Safety module: {}\n", format_tokens(chain.budget.safety_module)));
    output.push_str(&format!("  DEX:           {}\n", format_tokens(chain.budget.dex)));
    if let (Some(native), Some(per_epoch)) = (&chain.native_reward, chain.budget.native) {
        output.push_str(&format!(
            "  Native:        {} {}\n",
            format_tokens(per_epoch),
            native.symbol
        ));
    }
    if !chain.home {
        output.push_str(&format!(
            "  Bridge fee:    {}\n",
            format_units(chain.bridge_cost_estimate, NATIVE_FEE_DECIMALS)?
        ));
    }
    output.push('\n');

    let cap = &chain.safety_module;
    output.push_str(&heading("Safety module", format));
    output.push_str(&format!("  Staked:          {}\n", format_tokens(cap.staked_total)));
    output.push_str(&format!("  Max per epoch:   {}\n", format_tokens(cap.max_reward_per_epoch)));
    output.push_str(&format!("  Secondary pool:  {}\n", format_tokens(cap.secondary_available)));
    output.push_str(&format!("  Capped:          {}\n", format_tokens(cap.capped_secondary)));
    output.push_str(&format!("  Left in custody: {}\n", format_tokens(cap.remaining_secondary)));
    output.push_str(&format!("  Projected APY:   {}\n\n", format_pct(cap.projected_apy(window))));

    if !chain.reserve_sales.is_empty() {
        output.push_str(&heading("Reserve sales", format));
        for sale in &chain.reserve_sales {
            output.push_str(&format!("  {} -> {}: {}\n", sale.market, sale.contract, sale.amount));
        }
        output.push('\n');
    }

    let rows: Vec<MarketRow> = chain.markets.iter().map(market_row).collect();
    output.push_str(&render_table(rows, format));
    output.push('\n');

    Ok(output)
}

pub fn format_allocation_report(allocation: &EpochAllocation, format: OutputFormat) -> Result<String> {
    if allocation.chains.is_empty() {
        return Ok("No chains.".to_string());
    }

    let mut output = String::new();
    output.push_str(&heading(
        &format!(
            "Epoch {} - {} ({} tokens)",
            allocation.window.start,
            allocation.window.end,
            format_tokens(allocation.global_epoch_budget)
        ),
        format,
    ));
    output.push('\n');

    for chain in &allocation.chains {
        output.push_str(&format_chain(chain, &allocation.window, format)?);
        output.push('\n');
    }

    Ok(output.trim_end().to_string())
}

pub fn format_epoch_window(window: &EpochWindow, format: OutputFormat) -> String {
    let mut output = heading("Upcoming epoch", format);
    output.push_str(&format!("  Start:  {}\n", window.start));
    output.push_str(&format!("  End:    {}\n", window.end));
    output.push_str(&format!("  Length: {} seconds", window.length));
    output
}
