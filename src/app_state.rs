use crate::config::FigureConfig;
use crate::performance::PerformanceStore;
use crate::utils::parser_registry::ParserRegistry;

/// 全局运行状态，在加载、绘图和保存各阶段之间共享解析器、配置与性能记录
pub struct AppState {
    pub parser_registry: ParserRegistry,
    pub config: FigureConfig,
    pub performance_store: PerformanceStore,
}

impl AppState {
    pub fn new(config: FigureConfig) -> Self {
        AppState {
            parser_registry: ParserRegistry::new(),
            config,
            performance_store: PerformanceStore::new(),
        }
    }
}
