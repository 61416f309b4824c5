//! 持股明细页面解析
//!
//! 从披露网站返回的 HTML 中提取参与者持股记录

use scraper::{ElementRef, Html, Selector};

use crate::error::{CrawlError, CrawlResult};
use crate::models::{ResultTable, ShareholdingRecord, TradeDate};

const CONTAINER: &str = "div.search-details-table-container.table-mobile-list-container";
const PARTICIPANT_ID: &str = "td.col-participant-id";
const PARTICIPANT_NAME: &str = "td.col-participant-name";
const SHAREHOLDING: &str = "td.col-shareholding.text-right";
const SHAREHOLDING_PERCENT: &str = "td.col-shareholding-percent.text-right";
const CELL_BODY: &str = "div.mobile-list-body";

/// 持股明细表格解析器
///
/// 选择器在构造时编译一次，之后可在多个工作线程间共享
#[derive(Debug)]
pub struct HtmlRecordExtractor {
    container: Selector,
    tbody: Selector,
    row: Selector,
    participant_id: Selector,
    participant_name: Selector,
    shareholding: Selector,
    shareholding_percent: Selector,
    cell_body: Selector,
}

fn compile(css: &str) -> CrawlResult<Selector> {
    Selector::parse(css)
        .map_err(|e| CrawlError::Configuration(format!("无效的选择器 {}: {:?}", css, e)))
}

impl HtmlRecordExtractor {
    pub fn new() -> CrawlResult<Self> {
        Ok(Self {
            container: compile(CONTAINER)?,
            tbody: compile("tbody")?,
            row: compile("tr")?,
            participant_id: compile(PARTICIPANT_ID)?,
            participant_name: compile(PARTICIPANT_NAME)?,
            shareholding: compile(SHAREHOLDING)?,
            shareholding_percent: compile(SHAREHOLDING_PERCENT)?,
            cell_body: compile(CELL_BODY)?,
        })
    }

    /// 解析一页持股明细
    ///
    /// 找不到结果容器、没有 tbody 或 tbody 中没有数据行时返回带固定列的空表，
    /// 表示该日没有披露数据。数据行缺少单元格或数值无法解析时返回
    /// `CrawlError::StructuralParse`。
    pub fn parse(
        &self,
        html: &str,
        stock_code: &str,
        trade_date: &TradeDate,
    ) -> CrawlResult<ResultTable> {
        let document = Html::parse_document(html);

        let Some(container) = document.select(&self.container).next() else {
            return Ok(ResultTable::empty());
        };
        let Some(body) = container.select(&self.tbody).next() else {
            return Ok(ResultTable::empty());
        };

        let mut table = ResultTable::empty();
        for (index, row) in body.select(&self.row).enumerate() {
            let participant_id = self.cell_text(&row, &self.participant_id, index, "participant_id")?;
            let participant_name =
                self.cell_text(&row, &self.participant_name, index, "participant_name")?;
            let shareholding = parse_shareholding(
                &self.cell_text(&row, &self.shareholding, index, "shareholding")?,
                index,
            )?;
            let shareholding_percent = parse_percent(
                &self.cell_text(
                    &row,
                    &self.shareholding_percent,
                    index,
                    "shareholding_percent",
                )?,
                index,
            )?;

            table.push(ShareholdingRecord {
                stock_code: stock_code.to_string(),
                trade_date: *trade_date,
                participant_id,
                participant_name,
                shareholding,
                shareholding_percent,
            });
        }

        Ok(table)
    }

    /// 取单元格内 `div.mobile-list-body` 的文本（去首尾空白）
    fn cell_text(
        &self,
        row: &ElementRef<'_>,
        cell: &Selector,
        index: usize,
        field: &'static str,
    ) -> CrawlResult<String> {
        let td = row
            .select(cell)
            .next()
            .ok_or_else(|| CrawlError::structural(index, field, "缺少单元格"))?;
        let body = td
            .select(&self.cell_body)
            .next()
            .ok_or_else(|| CrawlError::structural(index, field, "缺少 mobile-list-body"))?;

        Ok(body.text().collect::<String>().trim().to_string())
    }
}

/// "1,234,567" -> 1234567
fn parse_shareholding(text: &str, index: usize) -> CrawlResult<u64> {
    text.replace(',', "")
        .trim()
        .parse::<u64>()
        .map_err(|e| CrawlError::structural(index, "shareholding", format!("{:?}: {}", text, e)))
}

/// "12.34%" -> 12.34
fn parse_percent(text: &str, index: usize) -> CrawlResult<f64> {
    let value = text
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .map_err(|e| {
            CrawlError::structural(index, "shareholding_percent", format!("{:?}: {}", text, e))
        })?;

    if !(0.0..=100.0).contains(&value) {
        return Err(CrawlError::structural(
            index,
            "shareholding_percent",
            format!("持股比例超出范围: {}", value),
        ));
    }

    Ok(value)
}
