use crate::Result;
use crate::config::{ConfigurationManager, ContainerSection, RuntimeConfig};
use crate::container::TestContainer;
use crate::container::dry_run::{DryRunContainer, Journal};
use crate::container::runtime::RuntimeContainer;
use crate::error::RexamError;
use crate::probe::{InvokerKind, NativeInvokerFactory, ProbeInvokerFactory, ProcessInvokerFactory};
use std::sync::Arc;

/// 根据 `[container]` 配置创建容器
pub struct ContainerFactory {
    section: ContainerSection,
    native: Option<NativeInvokerFactory>,
}

impl ContainerFactory {
    pub fn new(section: ContainerSection) -> Self {
        Self {
            section,
            native: None,
        }
    }

    /// native 运行时的测试注册表只能由代码提供
    pub fn with_native(mut self, native: NativeInvokerFactory) -> Self {
        self.native = Some(native);
        self
    }

    pub fn container_names(&self) -> Vec<String> {
        (0..self.section.count)
            .map(|index| format!("{}-{}", self.section.name_prefix, index))
            .collect()
    }

    fn invoker_factory(&self) -> Result<Arc<dyn ProbeInvokerFactory>> {
        match self.section.runtime {
            InvokerKind::Process => Ok(Arc::new(ProcessInvokerFactory::new())),
            InvokerKind::Native => self
                .native
                .clone()
                .map(|native| Arc::new(native) as Arc<dyn ProbeInvokerFactory>)
                .ok_or_else(|| {
                    RexamError::Configuration(
                        "native runtime requires tests registered in code".to_string(),
                    )
                }),
        }
    }

    fn check_count(&self) -> Result<()> {
        if self.section.count == 0 {
            return Err(RexamError::Configuration(
                "container.count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn create(&self, cm: &ConfigurationManager) -> Result<Vec<Box<dyn TestContainer>>> {
        self.check_count()?;
        let runtime = RuntimeConfig::from_manager(cm)?;
        let invokers = self.invoker_factory()?;

        tracing::debug!(
            count = self.section.count,
            runtime = %self.section.runtime,
            home = %runtime.home.display(),
            "Creating containers"
        );

        Ok(self
            .container_names()
            .into_iter()
            .map(|name| {
                Box::new(RuntimeContainer::new(name, runtime.clone(), Arc::clone(&invokers)))
                    as Box<dyn TestContainer>
            })
            .collect())
    }

    pub fn create_dry_run(&self, journal: &Journal) -> Result<Vec<Box<dyn TestContainer>>> {
        self.check_count()?;
        Ok(self
            .container_names()
            .into_iter()
            .map(|name| Box::new(DryRunContainer::new(name, journal.clone())) as Box<dyn TestContainer>)
            .collect())
    }
}
