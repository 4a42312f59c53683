/// Short tickers that are always treated as US listings.
const KNOWN_US_TICKERS: [&str; 8] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "NFLX"];

const NSE_SUFFIX: &str = ".NS";
const BSE_SUFFIX: &str = ".BO";

/// 将用户输入的代码规范为带交易所后缀的代码
///
/// 已带后缀的原样返回；`XXX-NSE`/`XXX-BSE` 改写为 `XXX.NS`/`XXX.BO`；
/// 不超过 5 个字母视为美股；更长的纯字母代码默认归入 NSE。
pub fn normalize_ticker(raw: &str) -> String {
    let ticker = raw.trim().to_uppercase();

    if ticker.contains('.') {
        return ticker;
    }

    if ticker.ends_with("-NSE") || ticker.ends_with("-BSE") {
        let mut parts = ticker.split('-');
        let base = parts.next().unwrap_or_default();
        match parts.next() {
            Some("NSE") => return format!("{}{}", base, NSE_SUFFIX),
            Some("BSE") => return format!("{}{}", base, BSE_SUFFIX),
            _ => {}
        }
    }

    let alphabetic = !ticker.is_empty() && ticker.chars().all(char::is_alphabetic);
    let len = ticker.chars().count();

    if KNOWN_US_TICKERS.contains(&ticker.as_str()) || (alphabetic && len <= 5) {
        return ticker;
    }

    if alphabetic && len > 5 && !is_indian_symbol(&ticker) {
        return format!("{}{}", ticker, NSE_SUFFIX);
    }

    ticker
}

pub fn is_indian_symbol(symbol: &str) -> bool {
    symbol.ends_with(NSE_SUFFIX) || symbol.ends_with(BSE_SUFFIX)
}

/// NSE 与 BSE 互为备选，其他市场没有备选
pub fn alternate_exchange_symbol(symbol: &str) -> Option<String> {
    if let Some(base) = symbol.strip_suffix(NSE_SUFFIX) {
        Some(format!("{}{}", base, BSE_SUFFIX))
    } else {
        symbol
            .strip_suffix(BSE_SUFFIX)
            .map(|base| format!("{}{}", base, NSE_SUFFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_dash_suffixes_are_rewritten() {
        assert_eq!(normalize_ticker("RELIANCE-NSE"), "RELIANCE.NS");
        assert_eq!(normalize_ticker("TCS-BSE"), "TCS.BO");
        assert_eq!(normalize_ticker(" tcs-bse "), "TCS.BO");
    }

    #[test]
    fn suffixed_input_is_only_uppercased_and_trimmed() {
        assert_eq!(normalize_ticker("  infy.ns "), "INFY.NS");
        assert_eq!(normalize_ticker("brk.b"), "BRK.B");
        assert_eq!(normalize_ticker("HDFC-NSE.BO"), "HDFC-NSE.BO");
    }

    #[test]
    fn short_alphabetic_tickers_stay_us() {
        assert_eq!(normalize_ticker("AAPL"), "AAPL");
        assert_eq!(normalize_ticker("googl"), "GOOGL");
        assert_eq!(normalize_ticker("f"), "F");
    }

    #[test]
    fn long_alphabetic_tickers_default_to_nse() {
        assert_eq!(normalize_ticker("INFOSYS"), "INFOSYS.NS");
        assert_eq!(normalize_ticker("reliance"), "RELIANCE.NS");
    }

    #[test]
    fn other_inputs_pass_through() {
        assert_eq!(normalize_ticker("500325"), "500325");
        assert_eq!(normalize_ticker("BTC-USD"), "BTC-USD");
        assert_eq!(normalize_ticker(""), "");
    }

    #[test]
    fn alternate_exchange_swaps_indian_suffixes() {
        assert_eq!(alternate_exchange_symbol("TCS.NS").as_deref(), Some("TCS.BO"));
        assert_eq!(alternate_exchange_symbol("TCS.BO").as_deref(), Some("TCS.NS"));
        assert_eq!(alternate_exchange_symbol("AAPL"), None);
    }
}
