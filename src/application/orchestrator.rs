//! Analysis Orchestrator
//!
//! Builds the fixed report prompt for a parsed signal, sends it to the
//! selected provider and interprets the verdict.

use crate::ports::registry::ProviderRegistry;
use crate::domain::analysis::AnalysisResult;
use crate::domain::token::TokenInfo;
use crate::ports::completion::ProviderError;

/// System prompt for signal analysis
pub const ANALYST_SYSTEM_PROMPT: &str =
    "你是一个专业的加密货币交易分析师，擅长分析市场趋势和代币表现。";

/// Per-call overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Provider name; the registry default when `None`
    pub provider: Option<String>,
    /// SOL amount the trade plan is sized to; the configured default when `None`
    pub buy_amount: Option<String>,
}

impl AnalysisOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_buy_amount(mut self, amount: impl Into<String>) -> Self {
        self.buy_amount = Some(amount.into());
        self
    }
}

/// Report prompt with the raw signal appended verbatim
pub fn build_analysis_prompt(risk_tolerance: &str, buy_amount: &str, raw_message: &str) -> String {
    format!(
        "你是一个顶级加密金融交易专家，帮我深度分析：
1、我可以接受{risk}风险投资。
2、报告里增加情绪分析、趋势预测和风险评估（1-10分，10分最高风险）。
3、搜索 X 或网络上的最新动态和社区情绪，给我更全面的信息。
4、综合交易信息与最新动态和社区情绪信息，判断是否买入，给出具体买入理由。
5、如果建议买入，假设我投入 {amount} SOL，必须明确给出完整的交易计划，包括买入价格、止损价格、止盈价格和分批卖出计划，交易机器人会按照你给的交易方案执行。
6、请按照以下格式提供分析报告：
### 深度分析报告
报告结果：[明确写出\"建议购买\"或\"建议放弃\"，并简要总结理由]

#### 1. 最新动态与社区情绪
- 网络上的最新动态：[分析代币的最新市场动态]
- 社区情绪：[分析社区对该代币的情绪和反应]

#### 2. 综合判断是否买入
- 买入理由：[如果建议买入，列出具体理由]
- 不买理由：[如果不建议买入，列出具体理由]

#### 3. 交易方案
- 投入金额：{amount} SOL
- 买入数量：[根据当前价格计算的买入数量]
- 卖出策略：
  1. 止盈点：[设定具体的止盈价格和百分比，以及卖出比例]
  2. 止损点：[设定具体的止损价格和百分比]
  3. 分批卖出计划：[详细的分批卖出策略]

#### 4. 风险控制
- 风险评估：[1-10分，10分为最高风险]
- 风险因素：[列出主要风险因素]
- 应对策略：[如何应对可能的风险]

### 深度分析报告结束

原始信息如下：
{raw}",
        risk = risk_tolerance,
        amount = buy_amount,
        raw = raw_message,
    )
}

/// Sends signals to a provider and reads back the verdict
#[derive(Debug, Clone)]
pub struct AnalysisOrchestrator {
    registry: ProviderRegistry,
    risk_tolerance: String,
    default_buy_amount: String,
}

impl AnalysisOrchestrator {
    pub fn new(
        registry: ProviderRegistry,
        risk_tolerance: impl Into<String>,
        default_buy_amount: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            risk_tolerance: risk_tolerance.into(),
            default_buy_amount: default_buy_amount.into(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn default_buy_amount(&self) -> &str {
        &self.default_buy_amount
    }

    /// Prompt for `token` sized to `buy_amount`
    pub fn prompt_for(&self, token: &TokenInfo, buy_amount: &str) -> String {
        build_analysis_prompt(&self.risk_tolerance, buy_amount, &token.raw_message)
    }

    /// Ask the provider for a report on `token`
    ///
    /// Fails without any request when the provider name is unknown or its
    /// credentials are missing. Rate limits are retried inside the provider.
    pub async fn analyze(
        &self,
        token: TokenInfo,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, ProviderError> {
        let provider = self.registry.resolve(options.provider.as_deref())?;
        let buy_amount = options
            .buy_amount
            .as_deref()
            .unwrap_or(&self.default_buy_amount);

        tracing::info!("Analyzing {} with {}...", token.label(), provider.name());

        let prompt = self.prompt_for(&token, buy_amount);
        let response = provider
            .complete(ANALYST_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| {
                tracing::error!("{} analysis failed: {}", provider.name(), e);
                e
            })?;

        let result = AnalysisResult::from_response(response, token);
        tracing::info!("Full analysis report:\n{}", result.full_analysis);
        Ok(result)
    }
}
