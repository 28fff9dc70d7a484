//! # 自动采集绑定（binding）
//!
//! ## 设计思路
//!
//! 每个开启实时同步的控件持有一个绑定：观察控件的 `source` 字符串与
//! `enabled` 开关，并把它们翻译成登记簿上的通道创建/替换/移除。
//! 不变量：**任一时刻一个控件至多一条活跃通道**。
//!
//! ## 实现思路
//!
//! - `sync` 幂等：配置无实质变化时不动登记簿。
//! - 切换描述符类型（图像↔蒙版）先移除另一类型的旧通道再创建新通道，
//!   中间不存在双通道窗口。
//! - 关闭、描述符退化为非 Photoshop 来源、或绑定被丢弃时移除通道。

use std::sync::{Arc, Mutex, MutexGuard};

use crate::source::SourceDescriptor;

use super::registry::UploadPassRegistry;

struct BoundPass {
    key: String,
    descriptor: SourceDescriptor,
}

/// 控件级自动采集绑定。
pub struct AutoCaptureBinding {
    registry: Arc<UploadPassRegistry>,
    /// 多图控件里该绑定对应的槽位。
    target_index: Option<usize>,
    bound: Mutex<Option<BoundPass>>,
}

impl AutoCaptureBinding {
    pub fn new(registry: Arc<UploadPassRegistry>, target_index: Option<usize>) -> Self {
        Self {
            registry,
            target_index,
            bound: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<BoundPass>> {
        match self.bound.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("绑定状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    /// 将控件当前的 `source` 与开关状态同步到登记簿。
    pub fn sync(&self, source: &str, enabled: bool) {
        let descriptor = SourceDescriptor::parse(source);
        let mut bound = self.lock();

        if !enabled || !descriptor.is_photoshop() {
            if let Some(old) = bound.take() {
                self.registry.remove_key(&old.key);
            }
            return;
        }

        if let Some(old) = bound.as_ref() {
            if old.descriptor == descriptor {
                // 无实质变化，保持现有通道。
                return;
            }
            // 类型切换或参数变化：先移除旧通道，保证单通道不变量。
            let old = bound.take();
            if let Some(old) = old {
                self.registry.remove_key(&old.key);
            }
        }

        let key = match &descriptor {
            SourceDescriptor::PhotoshopImage(config) => self
                .registry
                .create_image_pass(config.clone(), self.target_index),
            SourceDescriptor::PhotoshopMask(config) => self
                .registry
                .create_mask_pass(config.clone(), self.target_index),
            // is_photoshop 已筛掉其余变体。
            _ => return,
        };

        *bound = Some(BoundPass { key, descriptor });
    }

    /// 解除绑定并移除通道。未绑定时为空操作。
    pub fn unbind(&self) {
        if let Some(old) = self.lock().take() {
            self.registry.remove_key(&old.key);
        }
    }

    /// 当前绑定的通道键。
    pub fn bound_key(&self) -> Option<String> {
        self.lock().as_ref().map(|bound| bound.key.clone())
    }
}

impl Drop for AutoCaptureBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}
