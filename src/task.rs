// 该文件是 Goutu （构图顾问） 项目的一部分。
// src/task.rs - 推荐请求的调度与结果投递
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::advisor::{Advisor, AdvisorError};
use crate::frame::Frame;
use crate::model::CompositionBox;
use crate::pose::PoseRecommendation;

#[derive(Error, Debug)]
pub enum RequestError {
  #[error("推荐失败: {0}")]
  Advisor(#[from] AdvisorError),
  #[error("工作线程未给出结果")]
  Abandoned,
}

/// 一次性请求标志：`request` 置位，分发时被取走，只有新的请求才会再次置位
#[derive(Debug, Default)]
pub struct RequestFlag {
  armed: AtomicBool,
}

impl RequestFlag {
  pub fn request(&self) {
    self.armed.store(true, Ordering::SeqCst);
  }

  /// 取走标志，返回取走前是否置位
  pub fn take(&self) -> bool {
    self.armed.swap(false, Ordering::SeqCst)
  }

  pub fn is_armed(&self) -> bool {
    self.armed.load(Ordering::SeqCst)
  }
}

/// 单次赋值的结果写入端
pub struct Promise<T> {
  tx: SyncSender<Result<T, AdvisorError>>,
}

/// 单次赋值的结果读取端
pub struct Pending<T> {
  rx: Receiver<Result<T, AdvisorError>>,
}

pub fn promise<T>() -> (Promise<T>, Pending<T>) {
  let (tx, rx) = sync_channel(1);
  (Promise { tx }, Pending { rx })
}

impl<T> Promise<T> {
  pub fn fulfill(self, result: Result<T, AdvisorError>) {
    if self.tx.send(result).is_err() {
      debug!("请求方已放弃结果");
    }
  }
}

impl<T> Pending<T> {
  /// 阻塞等待结果
  pub fn wait(self) -> Result<T, RequestError> {
    match self.rx.recv() {
      Ok(result) => Ok(result?),
      Err(_) => Err(RequestError::Abandoned),
    }
  }

  /// 结果尚未就绪时返回 None
  pub fn try_get(&self) -> Option<Result<T, RequestError>> {
    match self.rx.try_recv() {
      Ok(result) => Some(result.map_err(RequestError::from)),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => Some(Err(RequestError::Abandoned)),
    }
  }
}

/// 最近一次结果，后写入者覆盖
#[derive(Debug)]
pub struct Latest<T> {
  value: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Latest<T> {
  fn clone(&self) -> Self {
    Self {
      value: Arc::clone(&self.value),
    }
  }
}

impl<T> Default for Latest<T> {
  fn default() -> Self {
    Self {
      value: Arc::new(Mutex::new(None)),
    }
  }
}

impl<T: Clone> Latest<T> {
  pub fn set(&self, value: T) {
    *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
  }

  pub fn clear(&self) {
    *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
  }

  pub fn get(&self) -> Option<T> {
    self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

/// 单帧触发的请求
#[derive(Default)]
pub struct Dispatched {
  pub pose: Option<Pending<PoseRecommendation>>,
  pub composition: Option<Pending<CompositionBox>>,
}

/// 相机会话：持有请求标志与最近结果，在分析帧时分发后台推荐任务
pub struct RecommendationSession {
  advisor: Arc<Advisor>,
  pose_flag: RequestFlag,
  composition_flag: RequestFlag,
  pose_state: Latest<PoseRecommendation>,
  composition_state: Latest<CompositionBox>,
}

impl RecommendationSession {
  pub fn new(advisor: Arc<Advisor>) -> Self {
    Self {
      advisor,
      pose_flag: RequestFlag::default(),
      composition_flag: RequestFlag::default(),
      pose_state: Latest::default(),
      composition_state: Latest::default(),
    }
  }

  pub fn request_pose(&self) {
    self.pose_flag.request();
  }

  pub fn request_composition(&self) {
    self.composition_flag.request();
  }

  pub fn pose(&self) -> Option<PoseRecommendation> {
    self.pose_state.get()
  }

  pub fn composition(&self) -> Option<CompositionBox> {
    self.composition_state.get()
  }

  /// 对已置位的请求各分发一个后台任务，未置位的请求不做任何事
  pub fn on_frame(&self, frame: &Frame) -> Dispatched {
    let mut dispatched = Dispatched::default();

    if self.pose_flag.take() {
      info!("分发姿态推荐请求");
      self.pose_state.clear();
      dispatched.pose = Some(spawn_request(
        "goutu-pose",
        Arc::clone(&self.advisor),
        frame.clone(),
        self.pose_state.clone(),
        |advisor, frame| advisor.recommend_pose(frame),
      ));
    }

    if self.composition_flag.take() {
      info!("分发构图推荐请求");
      self.composition_state.clear();
      dispatched.composition = Some(spawn_request(
        "goutu-composition",
        Arc::clone(&self.advisor),
        frame.clone(),
        self.composition_state.clone(),
        |advisor, frame| advisor.recommend_composition(frame),
      ));
    }

    dispatched
  }
}

fn spawn_request<T, F>(
  name: &str,
  advisor: Arc<Advisor>,
  frame: Frame,
  state: Latest<T>,
  work: F,
) -> Pending<T>
where
  T: Clone + Send + 'static,
  F: FnOnce(&Advisor, &Frame) -> Result<T, AdvisorError> + Send + 'static,
{
  let (promise, pending) = promise();
  let task_name = name.to_string();
  let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
    let now = Instant::now();
    let result = work(&advisor, &frame);
    match &result {
      Ok(value) => {
        state.set(value.clone());
        info!("{} 完成，耗时: {:.2?}", task_name, now.elapsed());
      }
      Err(e) => warn!("{} 失败: {}", task_name, e),
    }
    promise.fulfill(result);
  });
  if let Err(e) = spawned {
    // 线程未启动时 promise 随闭包一起被丢弃，读取端得到 Abandoned
    error!("启动工作线程 {} 失败: {}", name, e);
  }
  pending
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::advisor::tests::{Failing, Fixed, advisor, frame};

  fn session(embedding: Vec<f32>) -> RecommendationSession {
    RecommendationSession::new(Arc::new(advisor(
      Arc::new(Fixed(embedding)),
      Arc::new(Fixed(vec![0.5, 0.5, 0.25, 0.25])),
    )))
  }

  #[test]
  fn flag_is_one_shot() {
    let flag = RequestFlag::default();
    assert!(!flag.take());
    flag.request();
    assert!(flag.is_armed());
    assert!(flag.take());
    assert!(!flag.take());
  }

  #[test]
  fn no_request_means_no_work() {
    let s = session(vec![0.0; 3]);
    let d = s.on_frame(&frame());
    assert!(d.pose.is_none());
    assert!(d.composition.is_none());
  }

  #[test]
  fn request_is_served_once() {
    let s = session(vec![0.0; 3]);
    s.request_pose();
    let first = s.on_frame(&frame());
    let second = s.on_frame(&frame());
    let rec = first.pose.unwrap().wait().unwrap();
    assert_eq!(rec.pose_id, 4);
    assert!(second.pose.is_none());
    assert_eq!(s.pose(), Some(rec));
  }

  #[test]
  fn both_kinds_run_independently() {
    let s = session(vec![5.0; 3]);
    s.request_pose();
    s.request_composition();
    let d = s.on_frame(&frame());
    assert_eq!(d.pose.unwrap().wait().unwrap().pose_id, 9);
    let b = d.composition.unwrap().wait().unwrap();
    assert_eq!(b.width, 0.25);
    assert_eq!(s.composition(), Some(b));
  }

  #[test]
  fn failure_is_reported_through_its_own_promise() {
    let s = RecommendationSession::new(Arc::new(advisor(
      Arc::new(Failing),
      Arc::new(Fixed(vec![0.5, 0.5, 0.25, 0.25])),
    )));
    s.request_pose();
    s.request_composition();
    let d = s.on_frame(&frame());
    assert!(matches!(
      d.pose.unwrap().wait(),
      Err(RequestError::Advisor(AdvisorError::Model(_)))
    ));
    assert!(d.composition.unwrap().wait().is_ok());
    assert_eq!(s.pose(), None);
  }

  #[test]
  fn dispatch_clears_previous_state() {
    let s = session(vec![0.0; 3]);
    s.request_pose();
    s.on_frame(&frame()).pose.unwrap().wait().unwrap();
    assert!(s.pose().is_some());

    // 失败的请求不会写回状态，分发时清空的状态保持为空
    s.request_pose();
    let empty = Frame::from(image::RgbImage::new(0, 0));
    let d = s.on_frame(&empty);
    assert!(d.pose.unwrap().wait().is_err());
    assert_eq!(s.pose(), None);
  }

  #[test]
  fn pending_is_empty_until_fulfilled() {
    let (promise, pending) = promise::<u8>();
    assert!(pending.try_get().is_none());
    promise.fulfill(Ok(7));
    assert!(matches!(pending.try_get(), Some(Ok(7))));
  }

  #[test]
  fn dropped_promise_is_abandoned() {
    let (promise, pending) = promise::<u8>();
    drop(promise);
    assert!(matches!(pending.wait(), Err(RequestError::Abandoned)));
  }

  #[test]
  fn latest_write_wins() {
    let latest = Latest::default();
    latest.set(1);
    latest.clone().set(2);
    assert_eq!(latest.get(), Some(2));
    latest.clear();
    assert_eq!(latest.get(), None);
  }
}
